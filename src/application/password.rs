//! Password hashing via bcrypt.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::app_error::{AppError, AppResult};

/// Strength-configurable one-way hasher for credential secrets.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    cost: u32,
    /// Hash at the same cost, compared against when there is no stored hash.
    dummy: Arc<OnceCell<String>>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost,
            dummy: Arc::new(OnceCell::new()),
        }
    }

    pub fn hash(&self, password: &str) -> AppResult<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("bcrypt hash: {e}")))
    }

    /// Compare a password against a stored hash. A corrupt hash counts as a mismatch.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match bcrypt::verify(password, hash) {
            Ok(valid) => valid,
            Err(err) => {
                tracing::warn!(error = %err, "Stored password hash could not be parsed");
                false
            }
        }
    }

    /// Spend the same work as `verify` when there is no identity to check
    /// against. Always false.
    pub fn verify_dummy(&self, password: &str) -> bool {
        match self
            .dummy
            .get_or_try_init(|| self.hash("dummy-password-never-matches"))
        {
            Ok(hash) => {
                let _ = self.verify(password, hash);
            }
            Err(err) => tracing::warn!(error = %err, "Could not build dummy password hash"),
        }
        false
    }

    pub(crate) fn dummy_hash(&self) -> Option<&str> {
        self.dummy.get().map(String::as_str)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}
