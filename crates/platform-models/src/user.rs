use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated principal. `password_hash` is an
/// argon2id hash; it is never serialized back to clients.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub tenant_id: Uuid,
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: Uuid,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            password_hash: password_hash.into(),
            tenant_id,
            is_active: true,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }
}
