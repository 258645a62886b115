use async_trait::async_trait;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, is_unique_violation, user::insert_user},
    app_error::{AppError, AppResult},
    application::use_cases::auth::{LedgerTx, RefreshTokenRepo},
    domain::entities::{
        refresh_token::RefreshTokenRecord,
        user::{NewUser, User},
    },
};

fn row_to_record(row: sqlx::postgres::PgRow) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: row.get("id"),
        token: row.get("refresh_token"),
        user_id: row.get("user_id"),
        is_revoked: row.get("is_revoked"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl RefreshTokenRepo for PostgresPersistence {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await.map_err(AppError::from)?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn find(&self, token: &str) -> AppResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, refresh_token, user_id, is_revoked, created_at
            FROM user_refresh_tokens
            WHERE refresh_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_record))
    }

    async fn count_active_for_user(&self, user_id: Uuid) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS active FROM user_refresh_tokens WHERE user_id = $1 AND NOT is_revoked",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.get("active"))
    }
}

/// Ledger transaction over a pooled connection. Rolled back on drop unless committed.
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn create_identity(&mut self, new_user: NewUser) -> AppResult<User> {
        insert_user(&mut *self.tx, &new_user).await
    }

    async fn lock_identity(&mut self, user_id: Uuid) -> AppResult<bool> {
        // Row lock on the identity serializes every issuance and rotation for it.
        let row = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(AppError::from)?;

        Ok(row.is_some())
    }

    async fn find(&mut self, token: &str) -> AppResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, refresh_token, user_id, is_revoked, created_at
            FROM user_refresh_tokens
            WHERE refresh_token = $1
            FOR UPDATE
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_record))
    }

    async fn persist(&mut self, user_id: Uuid, token: &str) -> AppResult<RefreshTokenRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO user_refresh_tokens (id, refresh_token, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, refresh_token, user_id, is_revoked, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "user_refresh_tokens_refresh_token_key") {
                AppError::DuplicateToken
            } else {
                AppError::from(e)
            }
        })?;

        Ok(row_to_record(row))
    }

    async fn revoke(&mut self, token: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE user_refresh_tokens SET is_revoked = TRUE WHERE refresh_token = $1 AND NOT is_revoked",
        )
        .bind(token)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(&mut self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE user_refresh_tokens SET is_revoked = TRUE WHERE user_id = $1 AND NOT is_revoked",
        )
        .bind(user_id)
        .execute(&mut *self.tx)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(AppError::from)
    }
}
