//! Caller identity resolution. Generalizes the
//! teacher's `jwt_auth_middleware` extensions-injection idiom, but rejects
//! strictly instead of falling through to unauthenticated: a malformed
//! credential is a 401, not a silent anonymous request.

use std::sync::Arc;

use axum::http::HeaderMap;
use platform_auth::AuthService;
use platform_kernel::{AppError, Identity};

/// Order of precedence: `X-API-Key` header, then `Authorization: Bearer`,
/// then `Authorization: Api-Key key:secret`, else `None` (unauthenticated).
pub async fn resolve(headers: &HeaderMap, auth: &Arc<dyn AuthService>) -> Result<Option<Identity>, AppError> {
    if let Some(header) = headers.get("x-api-key") {
        let value = header.to_str().map_err(|_| AppError::unauthorized("malformed X-API-Key header"))?;
        let (key, secret) = split_api_key_secret(headers, value)?;
        return validate_api_key(auth, &key, &secret).await.map(Some);
    }

    if let Some(header) = headers.get(axum::http::header::AUTHORIZATION) {
        let value = header.to_str().map_err(|_| AppError::unauthorized("malformed Authorization header"))?;
        if let Some(token) = value.strip_prefix("Bearer ") {
            validate_bearer_segments(token)?;
            return auth.validate_bearer_token(token).await.map(Some);
        }
        if let Some(pair) = value.strip_prefix("Api-Key ") {
            let (key, secret) = split_key_secret(pair)?;
            return validate_api_key(auth, key, secret).await.map(Some);
        }
        return Err(AppError::unauthorized("unrecognized Authorization scheme"));
    }

    Ok(None)
}

/// `X-API-Key` carries the key alone; the secret travels in a paired
/// `X-API-Secret` header.
fn split_api_key_secret(headers: &HeaderMap, key: &str) -> Result<(String, String), AppError> {
    let secret = headers
        .get("x-api-secret")
        .ok_or_else(|| AppError::unauthorized("X-API-Key requires a paired X-API-Secret header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("malformed X-API-Secret header"))?;
    Ok((key.to_string(), secret.to_string()))
}

fn split_key_secret(pair: &str) -> Result<(&str, &str), AppError> {
    pair.split_once(':')
        .filter(|(key, secret)| !key.is_empty() && !secret.is_empty())
        .ok_or_else(|| AppError::unauthorized("api key must be \"key:secret\""))
}

/// Bearer tokens must have three dot-separated segments before any network
/// call is made.
fn validate_bearer_segments(token: &str) -> Result<(), AppError> {
    if token.split('.').count() != 3 || token.is_empty() {
        return Err(AppError::unauthorized("malformed bearer token"));
    }
    Ok(())
}

async fn validate_api_key(auth: &Arc<dyn AuthService>, key: &str, secret: &str) -> Result<Identity, AppError> {
    if key.len() < platform_models::MIN_KEY_LENGTH {
        return Err(AppError::unauthorized("api key too short"));
    }
    if secret.len() < platform_models::MIN_SECRET_LENGTH {
        return Err(AppError::unauthorized("api secret too short"));
    }
    auth.validate_api_key(key, secret).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use platform_auth::{IssuedApiKeyResult, LoginResult};
    use uuid::Uuid;

    struct StubAuth;

    #[async_trait]
    impl AuthService for StubAuth {
        async fn register(&self, _tenant_name: &str, _email: &str, _password: &str) -> Result<LoginResult, AppError> {
            unimplemented!()
        }
        async fn login(&self, _email: &str, _password: &str) -> Result<LoginResult, AppError> {
            unimplemented!()
        }
        async fn refresh(&self, _refresh_token: &str) -> Result<LoginResult, AppError> {
            unimplemented!()
        }
        async fn logout(&self, _access_token: &str) -> Result<(), AppError> {
            unimplemented!()
        }
        async fn validate_bearer_token(&self, access_token: &str) -> Result<Identity, AppError> {
            if access_token == "a.b.c" {
                Ok(identity())
            } else {
                Err(AppError::unauthorized("bad token"))
            }
        }
        async fn validate_api_key(&self, key: &str, secret: &str) -> Result<Identity, AppError> {
            if key == "k".repeat(16) && secret == "s" {
                Ok(identity())
            } else {
                Err(AppError::unauthorized("bad api key"))
            }
        }
        async fn issue_api_key(&self, _tenant_id: Uuid, _display_name: &str) -> Result<IssuedApiKeyResult, AppError> {
            unimplemented!()
        }
        async fn revoke_api_key(&self, _tenant_id: Uuid, _api_key_id: Uuid) -> Result<(), AppError> {
            unimplemented!()
        }
    }

    fn identity() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            email: "a@x.io".into(),
            is_admin: false,
            roles: vec![],
            permissions: vec!["checks:*".into()],
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn auth() -> Arc<dyn AuthService> {
        Arc::new(StubAuth)
    }

    #[tokio::test]
    async fn no_credentials_is_unauthenticated() {
        let headers = HeaderMap::new();
        assert!(resolve(&headers, &auth()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn valid_bearer_resolves_identity() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Bearer a.b.c".parse().unwrap());
        assert!(resolve(&headers, &auth()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn malformed_bearer_rejected_before_network_call() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Bearer not-three-segments".parse().unwrap());
        assert!(resolve(&headers, &auth()).await.is_err());
    }

    #[tokio::test]
    async fn api_key_authorization_header_resolves_identity() {
        let mut headers = HeaderMap::new();
        let pair = format!("Api-Key {}:{}", "k".repeat(16), "s");
        headers.insert(axum::http::header::AUTHORIZATION, pair.parse().unwrap());
        assert!(resolve(&headers, &auth()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn api_key_missing_colon_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Api-Key nocolon".parse().unwrap());
        assert!(resolve(&headers, &auth()).await.is_err());
    }

    #[tokio::test]
    async fn x_api_key_without_paired_secret_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "k".repeat(16).parse().unwrap());
        assert!(resolve(&headers, &auth()).await.is_err());
    }

    #[tokio::test]
    async fn x_api_key_with_paired_secret_resolves_identity() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "k".repeat(16).parse().unwrap());
        headers.insert("x-api-secret", "s".parse().unwrap());
        assert!(resolve(&headers, &auth()).await.unwrap().is_some());
    }
}
