//! Axum middleware stack: client IP extraction first, then identity
//! resolution, then permission enforcement, then rate limiting, so each
//! later stage can rely on what the earlier one attached to the request's
//! extensions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use platform_kernel::{AppError, Identity, RequestContext};
use uuid::Uuid;

use crate::client_ip;
use crate::errors::GatewayError;
use crate::identity;
use crate::permissions;
use crate::rate_limit::Decision;
use crate::state::AppState;

/// Route prefixes reachable without an identity.
const PUBLIC_PREFIXES: &[&str] = &["/api/v1/auth/", "/health", "/ready", "/live"];

fn is_public(path: &str) -> bool {
    PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Extracts the caller's address from `X-Forwarded-For`/`X-Real-IP`/the
/// socket peer and stashes it in request extensions for later stages.
pub async fn client_ip_middleware(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    mut request: Request,
    next: Next,
) -> Response {
    let ip = client_ip::resolve(request.headers(), remote);
    request.extensions_mut().insert(ip);
    next.run(request).await
}

/// Resolves the caller's identity per the bearer-token/api-key precedence
/// and attaches a [`RequestContext`] to the request. Unauthenticated
/// requests are only allowed through for the enumerated public routes;
/// everything else is rejected with 401 here, before any handler runs.
pub async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let path = request.uri().path().to_string();
    let resolved = identity::resolve(request.headers(), &state.auth).await?;

    let identity = match resolved {
        Some(identity) => Some(identity),
        None if is_public(&path) => None,
        None => return Err(AppError::unauthorized("authentication required").into()),
    };

    let mut ctx = RequestContext::new(Uuid::new_v4(), Duration::from_secs(30));
    if let Some(identity) = identity.clone() {
        ctx = ctx.with_identity(identity);
    }
    request.extensions_mut().insert(ctx);
    if let Some(identity) = identity {
        request.extensions_mut().insert(identity);
    }
    Ok(next.run(request).await)
}

/// Enforces the permission required for (path, method). Routes with no
/// mapped permission (public routes, or prefixes the table is silent on)
/// pass through unchanged.
pub async fn permission_middleware(mut request: Request, next: Next) -> Result<Response, GatewayError> {
    let path = request.uri().path().to_string();
    let method = request.method().clone();

    if let Some(required) = permissions::required_permission(&path, &method) {
        let identity = request.extensions().get::<Identity>().cloned();
        match identity {
            Some(identity) if identity.has_permission(required) => {}
            Some(_) => return Err(AppError::forbidden("missing required permission").into()),
            None => return Err(AppError::unauthorized("authentication required").into()),
        }
    }

    Ok(next.run(request).await)
}

/// Fixed-window rate limit, keyed by resolved identity once available,
/// falling back to client IP.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let key = match request.extensions().get::<Identity>() {
        Some(identity) => format!("user:{}", identity.user_id),
        None => {
            let ip = request
                .extensions()
                .get::<std::net::IpAddr>()
                .copied()
                .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
            format!("ip:{ip}")
        }
    };

    if state.rate_limiter.check(&key).await == Decision::Deny {
        return Err(AppError::rate_limited("rate limit exceeded").into());
    }

    Ok(next.run(request).await)
}
