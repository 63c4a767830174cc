//! Error → HTTP translation. The body shape is stable
//! across every route: `{"error":{"code","message","details"}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use platform_kernel::{AppError, ErrorKind};
use serde_json::json;

pub struct GatewayError(pub AppError);

impl From<AppError> for GatewayError {
    fn from(err: AppError) -> Self {
        GatewayError(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        // Nonstandard but conventional (nginx's "client closed request");
        // there is no listed HTTP status for a caller-aborted operation.
        ErrorKind::Canceled => StatusCode::from_u16(499).unwrap(),
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn code_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "VALIDATION_ERROR",
        ErrorKind::Unauthorized => "UNAUTHORIZED",
        ErrorKind::Forbidden => "FORBIDDEN",
        ErrorKind::NotFound => "NOT_FOUND",
        ErrorKind::Conflict => "CONFLICT",
        ErrorKind::RateLimited => "TOO_MANY_REQUESTS",
        ErrorKind::Unavailable => "UNAVAILABLE",
        ErrorKind::Canceled => "CANCELED",
        ErrorKind::Timeout => "TIMEOUT",
        ErrorKind::Internal => "INTERNAL_ERROR",
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind);
        let body = Json(json!({
            "error": {
                "code": code_for(self.0.kind),
                "message": self.0.safe_message(),
                "details": self.0.details,
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rate_limited_maps_to_429() {
        assert_eq!(status_for(ErrorKind::RateLimited), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn unavailable_maps_to_503() {
        assert_eq!(status_for(ErrorKind::Unavailable), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn internal_maps_to_500() {
        assert_eq!(status_for(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
