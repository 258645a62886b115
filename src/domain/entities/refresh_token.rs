use chrono::NaiveDateTime;
use uuid::Uuid;

/// One issued refresh token. Revocation is one-way and records are kept for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub is_revoked: bool,
    pub created_at: Option<NaiveDateTime>,
}

impl RefreshTokenRecord {
    pub fn is_active(&self) -> bool {
        !self.is_revoked
    }
}
