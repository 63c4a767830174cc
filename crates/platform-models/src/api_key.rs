use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Long-lived service credential. Only hashes of
/// the public key and secret are persisted; the cleartext secret is
/// returned exactly once, at creation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub key_hash: String,
    pub secret_hash: String,
    pub display_name: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Minimum length of the public key part and the secret part.
pub const MIN_KEY_LENGTH: usize = 16;
pub const MIN_SECRET_LENGTH: usize = 1;

impl ApiKey {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(is_active: bool, expires_at: Option<DateTime<Utc>>) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            key_hash: "h".into(),
            secret_hash: "s".into(),
            display_name: "prod".into(),
            is_active,
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn inactive_key_is_unusable() {
        assert!(!key(false, None).is_usable(Utc::now()));
    }

    #[test]
    fn expired_key_is_unusable() {
        let k = key(true, Some(Utc::now() - chrono::Duration::seconds(1)));
        assert!(!k.is_usable(Utc::now()));
    }

    #[test]
    fn active_key_without_expiry_is_usable() {
        assert!(key(true, None).is_usable(Utc::now()));
    }
}
