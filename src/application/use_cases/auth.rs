use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::jwt::{SigningDomain, TokenCodec, TokenError};
use crate::application::password::PasswordHasher;
use crate::application::ports::notifier::Notifier;
use crate::application::use_cases::user::UserRepo;
use crate::application::validators::{
    is_valid_email, is_valid_name, is_valid_password, normalize_email,
};
use crate::domain::entities::refresh_token::RefreshTokenRecord;
use crate::domain::entities::user::{NewUser, User};

// ============================================================================
// Refresh Token Ledger
// ============================================================================

/// An open ledger transaction. Dropping it without `commit` rolls back.
#[async_trait]
pub trait LedgerTx: Send {
    /// Insert a new identity inside this transaction, so a failed issuance
    /// leaves no account behind. Fails with `IdentityAlreadyExists` when the
    /// email is taken.
    async fn create_identity(&mut self, new_user: NewUser) -> AppResult<User>;

    /// Take the per-identity lock that serializes issuance for `user_id`.
    /// Returns false if the identity does not exist.
    async fn lock_identity(&mut self, user_id: Uuid) -> AppResult<bool>;

    async fn find(&mut self, token: &str) -> AppResult<Option<RefreshTokenRecord>>;

    /// Insert a new active record. Fails with `DuplicateToken` if the string exists.
    async fn persist(&mut self, user_id: Uuid, token: &str) -> AppResult<RefreshTokenRecord>;

    /// Idempotent. Returns whether a row actually changed.
    async fn revoke(&mut self, token: &str) -> AppResult<bool>;

    /// Revoke every active record owned by `user_id`; returns how many changed.
    async fn revoke_all_for_user(&mut self, user_id: Uuid) -> AppResult<u64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

#[async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>>;
    async fn find(&self, token: &str) -> AppResult<Option<RefreshTokenRecord>>;
    async fn count_active_for_user(&self, user_id: Uuid) -> AppResult<i64>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct AuthUseCases {
    users: Arc<dyn UserRepo>,
    ledger: Arc<dyn RefreshTokenRepo>,
    codec: TokenCodec,
    hasher: PasswordHasher,
    notifier: Arc<dyn Notifier>,
}

impl AuthUseCases {
    pub fn new(
        users: Arc<dyn UserRepo>,
        ledger: Arc<dyn RefreshTokenRepo>,
        codec: TokenCodec,
        hasher: PasswordHasher,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            users,
            ledger,
            codec,
            hasher,
            notifier,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> AppResult<TokenPair> {
        if !is_valid_name(name) {
            return Err(AppError::InvalidInput("Invalid name".into()));
        }
        if !is_valid_email(email) {
            return Err(AppError::InvalidInput("Invalid email".into()));
        }
        if !is_valid_password(password) {
            return Err(AppError::InvalidInput(
                "Password must be 8-50 characters with upper and lower case letters, a digit and a symbol"
                    .into(),
            ));
        }

        let email = normalize_email(email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::IdentityAlreadyExists);
        }

        let password_hash = self.hasher.hash(password)?;

        // Identity and first refresh record commit together or not at all.
        let mut tx = self.ledger.begin().await?;
        let user = tx
            .create_identity(NewUser {
                email,
                password_hash,
                name: name.trim().to_string(),
            })
            .await?;
        if !tx.lock_identity(user.id).await? {
            return Err(AppError::IdentityNotFound);
        }
        let pair = self.issue_pair(tx.as_mut(), user.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "Identity registered");
        self.notifier.notify_user_registered(&user);
        Ok(pair)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<TokenPair> {
        let email = normalize_email(email);

        // Unknown, inactive and wrong-password all look the same to the caller,
        // in the response and in the time a bcrypt comparison takes.
        let user = self.users.find_by_email(&email).await?;
        let password_ok = match &user {
            Some(user) => self.hasher.verify(password, &user.password_hash),
            None => self.hasher.verify_dummy(password),
        };
        let user = match user {
            Some(user) if password_ok && user.is_active => user,
            _ => return Err(AppError::InvalidCredentials),
        };

        let mut tx = self.ledger.begin().await?;
        if !tx.lock_identity(user.id).await? {
            return Err(AppError::InvalidCredentials);
        }
        let pair = self.issue_pair(tx.as_mut(), user.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "Identity logged in");
        self.notifier.notify_user_logged_in(user.id);
        Ok(pair)
    }

    /// Rotate a refresh token: the presented token is revoked and a new pair
    /// is issued in the same transaction.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self
            .codec
            .verify(refresh_token, SigningDomain::Refresh)
            .map_err(|e| match e {
                TokenError::Expired => AppError::RefreshTokenExpired,
                TokenError::InvalidSignature => AppError::InvalidRefreshToken,
            })?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidRefreshToken)?;

        let mut tx = self.ledger.begin().await?;
        let identity_exists = tx.lock_identity(user_id).await?;

        let record = tx
            .find(refresh_token)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or(AppError::InvalidRefreshToken)?;
        if record.is_revoked {
            tracing::warn!(user_id = %user_id, record_id = %record.id, "Revoked refresh token presented");
            return Err(AppError::RefreshTokenRevoked);
        }
        // Inactive identities may still refresh; only a missing one fails here.
        if !identity_exists {
            return Err(AppError::IdentityNotFound);
        }

        tx.revoke(refresh_token).await?;
        let pair = self.issue_pair(tx.as_mut(), user_id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, "Refresh token rotated");
        Ok(pair)
    }

    /// Revoke a single refresh token. Unknown or already revoked tokens are a no-op.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> AppResult<()> {
        let mut tx = self.ledger.begin().await?;
        let changed = tx.revoke(refresh_token).await?;
        tx.commit().await?;

        tracing::info!(changed, "Refresh token revoked");
        Ok(())
    }

    /// Revoke every refresh token of an identity. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn logout_all(&self, user_id: Uuid) -> AppResult<()> {
        let mut tx = self.ledger.begin().await?;
        tx.lock_identity(user_id).await?;
        let revoked = tx.revoke_all_for_user(user_id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, revoked, "All refresh tokens revoked");
        Ok(())
    }

    /// Revoke prior refresh tokens, sign a new pair and persist the refresh
    /// token. Runs inside the caller's transaction, after `lock_identity`.
    async fn issue_pair(&self, tx: &mut dyn LedgerTx, user_id: Uuid) -> AppResult<TokenPair> {
        let revoked = tx.revoke_all_for_user(user_id).await?;

        let access_token = self.codec.issue(user_id, SigningDomain::Access)?;
        let refresh_token = self.codec.issue(user_id, SigningDomain::Refresh)?;
        tx.persist(user_id, &refresh_token).await?;

        tracing::debug!(user_id = %user_id, revoked, "Issued token pair");
        Ok(TokenPair {
            user_id,
            access_token,
            refresh_token,
        })
    }
}
