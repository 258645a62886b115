//! Test utilities shared by unit and HTTP-level tests.
//!
//! This module provides:
//! - Test data factories for creating valid fixtures
//! - In-memory repository implementations standing in for Postgres
//! - A builder that assembles a full `AppState` around those mocks

mod app_state_builder;
mod auth_mocks;
mod factories;

pub use app_state_builder::*;
pub use auth_mocks::*;
pub use factories::*;

use secrecy::SecretString;
use time::Duration;

use crate::application::jwt::{DomainKey, TokenCodec};
use crate::application::password::PasswordHasher;

/// Codec with fixed, distinct secrets for every signing domain.
pub fn test_codec() -> TokenCodec {
    TokenCodec::new(
        DomainKey::new(SecretString::new("test-access-secret".into()), Duration::minutes(15)),
        DomainKey::new(SecretString::new("test-refresh-secret".into()), Duration::days(30)),
        DomainKey::new(SecretString::new("test-secondary-secret".into()), Duration::hours(1)),
    )
}

/// Lowest bcrypt cost, so tests that hash stay fast.
pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(4)
}
