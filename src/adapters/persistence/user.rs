use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, is_unique_violation},
    app_error::{AppError, AppResult},
    application::use_cases::user::UserRepo,
    domain::entities::user::{NewUser, User, UserUpdate},
};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, is_active, profile_picture_url, created_at, updated_at";

fn row_to_user(row: sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        is_active: row.get("is_active"),
        profile_picture_url: row.get("profile_picture_url"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Runs on the ledger transaction's connection, so an identity and its first
/// refresh record commit together.
pub(crate) async fn insert_user<'e, E>(executor: E, new_user: &NewUser) -> AppResult<User>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO users (id, email, password_hash, name)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(&new_user.name)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        // Lost a race with a concurrent registration for the same email.
        if is_unique_violation(&e, "users_email_key") {
            AppError::IdentityAlreadyExists
        } else {
            AppError::from(e)
        }
    })?;

    Ok(row_to_user(row))
}

#[async_trait]
impl UserRepo for PostgresPersistence {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok(row.map(row_to_user))
    }

    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;

        Ok(row.map(row_to_user))
    }

    async fn update_fields(&self, user_id: Uuid, update: &UserUpdate) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                profile_picture_url = COALESCE($3, profile_picture_url),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(update.name.as_deref())
        .bind(update.profile_picture_url.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_user))
    }

    async fn save(&self, user: &User) -> AppResult<User> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET email = $2,
                password_hash = $3,
                name = $4,
                is_active = $5,
                profile_picture_url = $6,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.is_active)
        .bind(user.profile_picture_url.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        row.map(row_to_user).ok_or(AppError::IdentityNotFound)
    }
}
