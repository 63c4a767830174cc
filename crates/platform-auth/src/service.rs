use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use platform_kernel::{AppError, Clock, Identity, IdGenerator};
use platform_models::{Session, Tenant, User};
use platform_persistence::PersistencePort;
use uuid::Uuid;

use crate::api_key;
use crate::jwt::JwtService;
use crate::password;

pub struct LoginResult {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_seconds: i64,
}

pub struct IssuedApiKeyResult {
    pub key: String,
    pub secret: String,
}

/// Public contract for the authentication/session/credential subsystem.
/// Modeled as an in-process async trait so the gateway's RPC client and a
/// future networked backend share the exact same call surface.
///
/// `email` is globally unique (spec section 2), so `register`/`login`
/// resolve a user by email alone; a new tenant is provisioned as part of
/// registration, not passed in by the caller.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, tenant_name: &str, email: &str, password: &str) -> Result<LoginResult, AppError>;
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AppError>;
    async fn refresh(&self, refresh_token: &str) -> Result<LoginResult, AppError>;
    async fn logout(&self, access_token: &str) -> Result<(), AppError>;
    async fn validate_bearer_token(&self, access_token: &str) -> Result<Identity, AppError>;
    async fn validate_api_key(&self, key: &str, secret: &str) -> Result<Identity, AppError>;
    async fn issue_api_key(&self, tenant_id: Uuid, display_name: &str) -> Result<IssuedApiKeyResult, AppError>;
    async fn revoke_api_key(&self, tenant_id: Uuid, api_key_id: Uuid) -> Result<(), AppError>;
}

pub struct DefaultAuthService {
    persistence: Arc<dyn PersistencePort>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    jwt: JwtService,
}

impl DefaultAuthService {
    pub fn new(
        persistence: Arc<dyn PersistencePort>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        jwt: JwtService,
    ) -> Self {
        Self { persistence, clock, ids, jwt }
    }

    fn access_token_identity(&self, user: &User) -> Result<Identity, AppError> {
        let expires_at = self.clock.now() + self.jwt.access_token_duration();
        Ok(Identity {
            user_id: user.id,
            tenant_id: user.tenant_id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            roles: vec![],
            permissions: default_permissions(user.is_admin),
            expires_at,
        })
    }
}

/// Lowercase, hyphenated tenant slug prefix; the caller appends an id
/// fragment to keep the full slug unique across tenants sharing a name.
fn slugify(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        "tenant".to_string()
    } else {
        slug
    }
}

fn default_permissions(is_admin: bool) -> Vec<String> {
    if is_admin {
        vec!["*".to_string()]
    } else {
        vec!["checks:*".to_string(), "incidents:*".to_string(), "schedules:*".to_string()]
    }
}

#[async_trait]
impl AuthService for DefaultAuthService {
    async fn register(&self, tenant_name: &str, email: &str, password: &str) -> Result<LoginResult, AppError> {
        if self.persistence.get_user_by_email(email).await?.is_some() {
            return Err(AppError::conflict("a user with this email already exists"));
        }
        let now = self.clock.now();
        let tenant_id = self.ids.new_id();
        let slug = format!("{}-{}", slugify(tenant_name), &tenant_id.to_string()[..8]);
        let tenant = Tenant::new(tenant_id, tenant_name, slug, now);
        self.persistence.create_tenant(tenant).await?;

        let password_hash = password::hash_password(password)?;
        let mut user = User::new(self.ids.new_id(), email, password_hash, tenant_id, now);
        user.is_admin = true;
        let user = self.persistence.create_user(user).await?;
        self.issue_session(&user).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AppError> {
        let user = self
            .persistence
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;
        if !user.is_active {
            return Err(AppError::forbidden("account is disabled"));
        }
        if !password::verify_password(password, &user.password_hash)? {
            return Err(AppError::unauthorized("invalid credentials"));
        }
        self.issue_session(&user).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<LoginResult, AppError> {
        let claims = self.jwt.verify_refresh_token(refresh_token)?;
        let refresh_hash = api_key::hash(refresh_token);
        let session = self
            .persistence
            .get_session_by_refresh_hash(&refresh_hash)
            .await?
            .ok_or_else(|| AppError::unauthorized("session not found"))?;
        if session.is_expired(self.clock.now()) {
            self.persistence.delete_session(session.id).await?;
            return Err(AppError::unauthorized("session expired"));
        }
        let user = self
            .persistence
            .get_user(claims.tenant_id, claims.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("user not found"))?;
        self.persistence.delete_session(session.id).await?;
        self.issue_session(&user).await
    }

    async fn logout(&self, access_token: &str) -> Result<(), AppError> {
        let access_hash = api_key::hash(access_token);
        if let Some(session) = self.persistence.get_session_by_access_hash(&access_hash).await? {
            self.persistence.delete_session(session.id).await?;
        }
        Ok(())
    }

    async fn validate_bearer_token(&self, access_token: &str) -> Result<Identity, AppError> {
        let claims = self.jwt.verify_access_token(access_token)?;
        let user = self
            .persistence
            .get_user(claims.tenant_id, claims.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("user not found"))?;
        if !user.is_active {
            return Err(AppError::forbidden("account is disabled"));
        }
        self.access_token_identity(&user)
    }

    async fn validate_api_key(&self, key: &str, secret: &str) -> Result<Identity, AppError> {
        let key_hash = api_key::hash(key);
        let api_key = self
            .persistence
            .get_api_key_by_key_hash(&key_hash)
            .await?
            .ok_or_else(|| AppError::unauthorized("invalid api key"))?;
        if !api_key.is_usable(self.clock.now()) {
            return Err(AppError::unauthorized("api key is revoked or expired"));
        }
        if api_key.secret_hash != api_key::hash(secret) {
            return Err(AppError::unauthorized("invalid api key"));
        }
        Ok(Identity {
            user_id: api_key.id,
            tenant_id: api_key.tenant_id,
            email: api_key.display_name.clone(),
            is_admin: false,
            roles: vec!["service".to_string()],
            permissions: vec!["checks:*".to_string(), "incidents:*".to_string()],
            expires_at: api_key.expires_at.unwrap_or_else(|| self.clock.now() + chrono::Duration::days(3650)),
        })
    }

    async fn issue_api_key(&self, tenant_id: Uuid, display_name: &str) -> Result<IssuedApiKeyResult, AppError> {
        let issued = api_key::generate();
        let now = self.clock.now();
        let record = platform_models::ApiKey {
            id: self.ids.new_id(),
            tenant_id,
            key_hash: issued.key_hash,
            secret_hash: issued.secret_hash,
            display_name: display_name.to_string(),
            is_active: true,
            expires_at: None,
            created_at: now,
        };
        self.persistence.create_api_key(record).await?;
        Ok(IssuedApiKeyResult { key: issued.key, secret: issued.secret })
    }

    async fn revoke_api_key(&self, tenant_id: Uuid, api_key_id: Uuid) -> Result<(), AppError> {
        self.persistence.revoke_api_key(tenant_id, api_key_id).await
    }
}

impl DefaultAuthService {
    async fn issue_session(&self, user: &User) -> Result<LoginResult, AppError> {
        let access_token = self.jwt.issue_access_token(user.id, user.tenant_id, user.is_admin)?;
        let refresh_token = self.jwt.issue_refresh_token(user.id, user.tenant_id, user.is_admin)?;
        let now = self.clock.now();
        let session = Session::new(
            self.ids.new_id(),
            user.id,
            api_key::hash(&access_token),
            api_key::hash(&refresh_token),
            now + self.jwt.refresh_token_duration(),
            now,
        );
        self.persistence.create_session(session).await?;
        Ok(LoginResult {
            access_token,
            refresh_token,
            expires_in_seconds: self.jwt.access_token_duration().num_seconds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_kernel::{FakeClock, UuidGenerator};
    use platform_persistence::InMemoryPersistence;
    use std::sync::Arc;

    fn service() -> DefaultAuthService {
        let jwt = JwtService::new(
            "access-secret",
            "refresh-secret",
            "uptime-platform",
            chrono::Duration::minutes(15),
            chrono::Duration::days(30),
        );
        DefaultAuthService::new(
            Arc::new(InMemoryPersistence::new()),
            Arc::new(FakeClock::new(Utc::now())),
            Arc::new(UuidGenerator),
            jwt,
        )
    }

    #[tokio::test]
    async fn register_then_login_succeeds() {
        let svc = service();
        svc.register("Acme", "a@x.io", "hunter22").await.unwrap();
        let result = svc.login("a@x.io", "hunter22").await.unwrap();
        assert!(!result.access_token.is_empty());
    }

    #[tokio::test]
    async fn register_returns_usable_tokens() {
        let svc = service();
        let registered = svc.register("Acme", "a@x.io", "hunter22").await.unwrap();
        let identity = svc.validate_bearer_token(&registered.access_token).await.unwrap();
        assert_eq!(identity.email, "a@x.io");
        assert!(identity.is_admin, "the registering user owns the new tenant");
    }

    #[tokio::test]
    async fn login_with_wrong_password_rejected() {
        let svc = service();
        svc.register("Acme", "a@x.io", "hunter22").await.unwrap();
        assert!(svc.login("a@x.io", "wrong").await.is_err());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let svc = service();
        svc.register("Acme", "a@x.io", "hunter22").await.unwrap();
        assert!(svc.register("Other Co", "a@x.io", "other").await.is_err());
    }

    #[tokio::test]
    async fn access_token_validates_to_identity() {
        let svc = service();
        let registered = svc.register("Acme", "a@x.io", "hunter22").await.unwrap();
        let login = svc.login("a@x.io", "hunter22").await.unwrap();
        let identity = svc.validate_bearer_token(&login.access_token).await.unwrap();
        let registered_identity = svc.validate_bearer_token(&registered.access_token).await.unwrap();
        assert_eq!(identity.tenant_id, registered_identity.tenant_id);
    }

    #[tokio::test]
    async fn logout_invalidates_session() {
        let svc = service();
        svc.register("Acme", "a@x.io", "hunter22").await.unwrap();
        let login = svc.login("a@x.io", "hunter22").await.unwrap();
        svc.logout(&login.access_token).await.unwrap();
        // logout deletes the session row backing both halves of the pair.
        assert!(svc.refresh(&login.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn api_key_round_trips() {
        let svc = service();
        let tenant_id = Uuid::new_v4();
        let issued = svc.issue_api_key(tenant_id, "ci-bot").await.unwrap();
        let identity = svc.validate_api_key(&issued.key, &issued.secret).await.unwrap();
        assert_eq!(identity.tenant_id, tenant_id);
    }

    #[tokio::test]
    async fn revoked_api_key_rejected() {
        let svc = service();
        let tenant_id = Uuid::new_v4();
        let issued = svc.issue_api_key(tenant_id, "ci-bot").await.unwrap();
        let keys = svc
            .persistence
            .list_api_keys(tenant_id)
            .await
            .unwrap();
        let id = keys[0].id;
        svc.revoke_api_key(tenant_id, id).await.unwrap();
        assert!(svc.validate_api_key(&issued.key, &issued.secret).await.is_err());
    }
}
