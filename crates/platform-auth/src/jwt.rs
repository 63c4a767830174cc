use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use platform_kernel::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by both access and refresh tokens. `token_type`
/// distinguishes the two so a refresh token can never be used where an
/// access token is expected, and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub is_admin: bool,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Clone)]
pub struct JwtService {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    issuer: String,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl JwtService {
    pub fn new(
        access_secret: &str,
        refresh_secret: &str,
        issuer: impl Into<String>,
        access_token_duration: Duration,
        refresh_token_duration: Duration,
    ) -> Self {
        Self {
            access_encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(refresh_secret.as_bytes()),
            issuer: issuer.into(),
            access_token_duration,
            refresh_token_duration,
        }
    }

    pub fn issue_access_token(&self, user_id: Uuid, tenant_id: Uuid, is_admin: bool) -> Result<String, AppError> {
        self.issue(user_id, tenant_id, is_admin, TokenType::Access, self.access_token_duration, &self.access_encoding_key)
    }

    pub fn issue_refresh_token(&self, user_id: Uuid, tenant_id: Uuid, is_admin: bool) -> Result<String, AppError> {
        self.issue(user_id, tenant_id, is_admin, TokenType::Refresh, self.refresh_token_duration, &self.refresh_encoding_key)
    }

    fn issue(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        is_admin: bool,
        token_type: TokenType,
        duration: Duration,
        key: &EncodingKey,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            tenant_id,
            is_admin,
            token_type,
            exp: (now + duration).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, key).map_err(AppError::internal)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, &self.access_decoding_key, TokenType::Access)
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, &self.refresh_decoding_key, TokenType::Refresh)
    }

    pub fn access_token_duration(&self) -> Duration {
        self.access_token_duration
    }

    pub fn refresh_token_duration(&self) -> Duration {
        self.refresh_token_duration
    }

    fn verify(&self, token: &str, key: &DecodingKey, expected_type: TokenType) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        let claims = decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::unauthorized("invalid or expired token"))?;
        if claims.token_type != expected_type {
            return Err(AppError::unauthorized("token type mismatch"));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(
            "access-secret",
            "refresh-secret",
            "uptime-platform",
            Duration::minutes(15),
            Duration::days(30),
        )
    }

    #[test]
    fn access_token_round_trips() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let token = svc.issue_access_token(user_id, tenant_id, false).unwrap();
        let claims = svc.verify_access_token(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.tenant_id, tenant_id);
    }

    #[test]
    fn refresh_token_rejected_as_access_token() {
        let svc = service();
        let token = svc.issue_refresh_token(Uuid::new_v4(), Uuid::new_v4(), false).unwrap();
        assert!(svc.verify_access_token(&token).is_err());
    }

    #[test]
    fn tampered_signature_rejected() {
        let svc = service();
        let token = svc.issue_access_token(Uuid::new_v4(), Uuid::new_v4(), false).unwrap();
        let other = JwtService::new("wrong", "refresh-secret", "uptime-platform", Duration::minutes(15), Duration::days(30));
        assert!(other.verify_access_token(&token).is_err());
    }
}
