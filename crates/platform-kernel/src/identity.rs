//! The typed identity attached to a request at the single authentication
//! boundary: downstream code
//! reads `Identity` fields, never arbitrary string-keyed context values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl Identity {
    /// Permission strings are `<resource>:<verb>`; `*` and `<resource>:*`
    /// are wildcards.
    pub fn has_permission(&self, required: &str) -> bool {
        if self.is_admin {
            return true;
        }
        let (resource, _verb) = required.split_once(':').unwrap_or((required, ""));
        let resource_wildcard = format!("{resource}:*");
        self.permissions.iter().any(|p| {
            p == "*" || p == required || p == &resource_wildcard
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_with(permissions: Vec<&str>) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            email: "a@x.io".to_string(),
            is_admin: false,
            roles: vec![],
            permissions: permissions.into_iter().map(String::from).collect(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[test]
    fn exact_permission_matches() {
        let id = identity_with(vec!["checks:read"]);
        assert!(id.has_permission("checks:read"));
        assert!(!id.has_permission("checks:write"));
    }

    #[test]
    fn resource_wildcard_grants_all_verbs() {
        let id = identity_with(vec!["checks:*"]);
        assert!(id.has_permission("checks:read"));
        assert!(id.has_permission("checks:write"));
        assert!(!id.has_permission("incidents:read"));
    }

    #[test]
    fn global_wildcard_grants_everything() {
        let id = identity_with(vec!["*"]);
        assert!(id.has_permission("incidents:write"));
    }

    #[test]
    fn admin_bypasses_permission_list() {
        let mut id = identity_with(vec![]);
        id.is_admin = true;
        assert!(id.has_permission("config:write"));
    }

    #[test]
    fn expiry_is_exclusive_of_now() {
        let mut id = identity_with(vec!["*"]);
        id.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(id.is_expired(Utc::now()));
    }
}
