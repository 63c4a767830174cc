//! Required-permission lookup for a route: computed
//! from (path prefix, HTTP method), checked against `Identity::has_permission`
//! before any downstream call is made.

use axum::http::Method;

/// Returns the permission string required for `path`/`method`, or `None` if
/// the prefix is unrecognized (callers treat an unrecognized prefix as
/// requiring no specific permission beyond authentication).
pub fn required_permission(path: &str, method: &Method) -> Option<&'static str> {
    let prefix = [
        "/checks", "/incidents", "/notifications", "/metrics", "/config", "/forge",
    ]
    .into_iter()
    .find(|p| path.starts_with(p))?;

    match (prefix, method) {
        ("/checks", &Method::GET) => Some("checks:read"),
        ("/checks", &Method::POST) => Some("checks:write"),
        ("/checks", &Method::PUT) => Some("checks:write"),
        ("/checks", &Method::DELETE) => Some("checks:delete"),

        ("/incidents", &Method::GET) => Some("incidents:read"),
        ("/incidents", &Method::POST) => Some("incidents:write"),
        ("/incidents", &Method::PUT) => Some("incidents:write"),

        ("/notifications", &Method::POST) => Some("notifications:write"),

        ("/metrics", &Method::GET) => Some("metrics:read"),

        ("/config", &Method::GET) => Some("config:read"),
        ("/config", &Method::POST) => Some("config:write"),
        ("/config", &Method::PUT) => Some("config:write"),

        ("/forge", &Method::POST) => Some("forge:write"),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checks_get_requires_read() {
        assert_eq!(required_permission("/checks/123", &Method::GET), Some("checks:read"));
    }

    #[test]
    fn checks_delete_requires_delete() {
        assert_eq!(required_permission("/checks/123", &Method::DELETE), Some("checks:delete"));
    }

    #[test]
    fn incidents_put_requires_write() {
        assert_eq!(required_permission("/incidents/123", &Method::PUT), Some("incidents:write"));
    }

    #[test]
    fn notifications_get_has_no_mapped_permission() {
        assert_eq!(required_permission("/notifications", &Method::GET), None);
    }

    #[test]
    fn unknown_prefix_requires_nothing() {
        assert_eq!(required_permission("/auth/login", &Method::POST), None);
    }
}
