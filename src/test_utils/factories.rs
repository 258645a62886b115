//! Test data factories.
//!
//! Each factory returns a complete, valid object. Use the closure to override
//! specific fields.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::domain::entities::{refresh_token::RefreshTokenRecord, user::User};

/// Create an active test user. The password hash is a placeholder that never
/// verifies; override it when a test needs to log in.
pub fn create_test_user(overrides: impl FnOnce(&mut User)) -> User {
    let id = Uuid::new_v4();
    let mut user = User {
        id,
        email: format!("user-{}@example.com", id.simple()),
        password_hash: "not-a-bcrypt-hash".to_string(),
        name: "Test User".to_string(),
        is_active: true,
        profile_picture_url: None,
        created_at: Some(test_datetime()),
        updated_at: Some(test_datetime()),
    };
    overrides(&mut user);
    user
}

/// Create an active refresh token record owned by `user_id`.
pub fn create_test_refresh_token(
    user_id: Uuid,
    overrides: impl FnOnce(&mut RefreshTokenRecord),
) -> RefreshTokenRecord {
    let mut record = RefreshTokenRecord {
        id: Uuid::new_v4(),
        token: format!("refresh-{}", Uuid::new_v4()),
        user_id,
        is_revoked: false,
        created_at: Some(test_datetime()),
    };
    overrides(&mut record);
    record
}

/// Fixed timestamp for reproducible fixtures.
pub fn test_datetime() -> NaiveDateTime {
    chrono::DateTime::from_timestamp(1_700_000_000, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}
