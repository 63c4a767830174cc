//! Auth routes: all public, dispatched through the auth
//! backend's resilience wrapper since `AuthService` is the one dependency
//! every other route implicitly relies on via identity resolution.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub tenant_name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_seconds: i64,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub access_token: String,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub access_token: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), GatewayError> {
    let auth = state.auth.clone();
    let tenant_name = req.tenant_name.clone();
    let email = req.email.clone();
    let password = req.password.clone();
    let result = state
        .auth_backend
        .call(|| {
            let auth = auth.clone();
            let tenant_name = tenant_name.clone();
            let email = email.clone();
            let password = password.clone();
            async move { auth.register(&tenant_name, &email, &password).await }
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            access_token: result.access_token,
            refresh_token: result.refresh_token,
            expires_in_seconds: result.expires_in_seconds,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, GatewayError> {
    let auth = state.auth.clone();
    let result = state
        .auth_backend
        .call(|| {
            let auth = auth.clone();
            let email = req.email.clone();
            let password = req.password.clone();
            async move { auth.login(&email, &password).await }
        })
        .await?;
    Ok(Json(TokenResponse {
        access_token: result.access_token,
        refresh_token: result.refresh_token,
        expires_in_seconds: result.expires_in_seconds,
    }))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, GatewayError> {
    let auth = state.auth.clone();
    let result = state
        .auth_backend
        .call(|| {
            let auth = auth.clone();
            let token = req.refresh_token.clone();
            async move { auth.refresh(&token).await }
        })
        .await?;
    Ok(Json(TokenResponse {
        access_token: result.access_token,
        refresh_token: result.refresh_token,
        expires_in_seconds: result.expires_in_seconds,
    }))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> Result<StatusCode, GatewayError> {
    let auth = state.auth.clone();
    state
        .auth_backend
        .call(|| {
            let auth = auth.clone();
            let token = req.access_token.clone();
            async move { auth.logout(&token).await }
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let auth = state.auth.clone();
    let identity = state
        .auth_backend
        .call(|| {
            let auth = auth.clone();
            let token = req.access_token.clone();
            async move { auth.validate_bearer_token(&token).await }
        })
        .await?;
    Ok(Json(serde_json::to_value(identity).map_err(|e| GatewayError(platform_kernel::AppError::internal(e)))?))
}
