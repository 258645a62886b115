use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::ports::notifier::Notifier;
use crate::application::validators::{MAX_PICTURE_URL_LEN, is_valid_name};
use crate::domain::entities::user::{User, UserUpdate};

/// Credential store. Always returns full records, never projections.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>>;
    async fn update_fields(&self, user_id: Uuid, update: &UserUpdate) -> AppResult<Option<User>>;
    async fn save(&self, user: &User) -> AppResult<User>;
}

#[derive(Clone)]
pub struct UserUseCases {
    repo: Arc<dyn UserRepo>,
    notifier: Arc<dyn Notifier>,
}

impl UserUseCases {
    pub fn new(repo: Arc<dyn UserRepo>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repo, notifier }
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<User> {
        self.repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::IdentityNotFound)
    }

    #[instrument(skip(self))]
    pub async fn update_profile(&self, user_id: Uuid, update: UserUpdate) -> AppResult<User> {
        if let Some(name) = &update.name
            && !is_valid_name(name)
        {
            return Err(AppError::InvalidInput("Invalid name".into()));
        }
        if let Some(url) = &update.profile_picture_url
            && url.chars().count() > MAX_PICTURE_URL_LEN
        {
            return Err(AppError::InvalidInput("Profile picture URL is too long".into()));
        }

        let user = if update.is_empty() {
            self.get_profile(user_id).await?
        } else {
            let update = UserUpdate {
                name: update.name.map(|n| n.trim().to_string()),
                ..update
            };
            self.repo
                .update_fields(user_id, &update)
                .await?
                .ok_or(AppError::IdentityNotFound)?
        };

        self.notifier.notify_user_profile_updated(&user);
        Ok(user)
    }

    /// Soft state transition; existing access tokens stay valid until they expire.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, user_id: Uuid) -> AppResult<()> {
        let mut user = self.get_profile(user_id).await?;
        user.is_active = false;
        self.repo.save(&user).await?;

        tracing::info!(user_id = %user_id, "Account deactivated");
        self.notifier.notify_user_account_deactivated(user_id);
        Ok(())
    }
}
