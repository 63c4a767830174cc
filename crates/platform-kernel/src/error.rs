//! Shared error taxonomy for every component in the platform.
//!
//! A small, closed set of error kinds that every layer (persistence, RPC,
//! HTTP) maps its failures onto, so the gateway can translate any
//! downstream error to the right HTTP status without knowing which
//! service produced it.

use serde::Serialize;
use serde_json::Value;

/// The closed taxonomy of error kinds used across the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    Unavailable,
    Internal,
    Canceled,
    Timeout,
}

impl ErrorKind {
    /// Transient RPC status kinds eligible for retry.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Unavailable | ErrorKind::Timeout | ErrorKind::Internal)
    }
}

/// The platform's single error type. Every fallible operation above the
/// storage/transport driver layer returns `Result<T, AppError>`.
#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<Value>,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// Internal errors never leak their detail to the user; `source` carries
    /// the real cause for structured logs only.
    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        tracing::error!(error = %source, "internal error");
        Self {
            kind: ErrorKind::Internal,
            message: "an internal error occurred".to_string(),
            details: None,
            source: Some(source),
        }
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Canceled, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// A user-safe view of this error, never including secrets, SQL
    /// fragments, or internal paths.
    pub fn safe_message(&self) -> &str {
        &self.message
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::not_found("resource not found"),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    AppError::conflict("resource already exists")
                } else if db_err.is_foreign_key_violation() {
                    AppError::validation("referenced resource does not exist")
                } else {
                    AppError::internal(err)
                }
            }
            _ => AppError::internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds_match_spec_glossary() {
        assert!(ErrorKind::Unavailable.is_transient());
        assert!(ErrorKind::Timeout.is_transient());
        assert!(ErrorKind::Internal.is_transient());
        assert!(!ErrorKind::Validation.is_transient());
        assert!(!ErrorKind::NotFound.is_transient());
    }

    #[test]
    fn internal_error_hides_source_message() {
        let err = AppError::internal(anyhow::anyhow!("password=hunter2 leaked in sql"));
        assert_eq!(err.safe_message(), "an internal error occurred");
        assert!(err.source.is_some());
    }
}
