use sqlx::PgPool;

use crate::app_error::AppError;

pub mod refresh_token;
pub mod user;

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Whether `err` is a unique violation on the named constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                    AppError::InvalidInput("A record with this value already exists".into())
                } else if db_err.message().contains("violates foreign key") {
                    AppError::InvalidInput("Referenced record not found".into())
                } else {
                    // Log the actual error, don't expose details
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
