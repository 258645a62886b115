//! In-memory implementations of the credential store, the refresh token
//! ledger and the notifier.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::notifier::Notifier,
        use_cases::{
            auth::{LedgerTx, RefreshTokenRepo},
            user::UserRepo,
        },
    },
    domain::entities::{
        refresh_token::RefreshTokenRecord,
        user::{NewUser, User, UserUpdate},
    },
};

// ============================================================================
// InMemoryUserRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepo {
    pub users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        let map: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();
        Self {
            users: Mutex::new(map),
        }
    }

    /// Drop a row outright. Only tests do this; the service never hard-deletes.
    pub fn remove(&self, user_id: Uuid) {
        self.users.lock().unwrap().remove(&user_id);
    }

    pub fn exists(&self, user_id: Uuid) -> bool {
        self.users.lock().unwrap().contains_key(&user_id)
    }
}

fn new_identity(new_user: NewUser) -> User {
    let now = chrono::Utc::now().naive_utc();
    User {
        id: Uuid::new_v4(),
        email: new_user.email,
        password_hash: new_user.password_hash,
        name: new_user.name,
        is_active: true,
        profile_picture_url: None,
        created_at: Some(now),
        updated_at: Some(now),
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn update_fields(&self, user_id: Uuid, update: &UserUpdate) -> AppResult<Option<User>> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(url) = &update.profile_picture_url {
            user.profile_picture_url = Some(url.clone());
        }
        user.updated_at = Some(chrono::Utc::now().naive_utc());
        Ok(Some(user.clone()))
    }

    async fn save(&self, user: &User) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.id) {
            return Err(AppError::IdentityNotFound);
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }
}

// ============================================================================
// InMemoryRefreshTokenRepo
// ============================================================================

#[derive(Default)]
struct LedgerState {
    records: HashMap<String, RefreshTokenRecord>,
}

/// Ledger whose transactions hold one global lock and work on a staged copy,
/// so an uncommitted transaction leaves no trace. Coarser than row locks but
/// gives the same serialization guarantees per identity.
pub struct InMemoryRefreshTokenRepo {
    users: Arc<InMemoryUserRepo>,
    state: Arc<AsyncMutex<LedgerState>>,
    fail_persist: Arc<AtomicBool>,
}

impl InMemoryRefreshTokenRepo {
    pub fn new(users: Arc<InMemoryUserRepo>) -> Self {
        Self::with_records(users, Vec::new())
    }

    pub fn with_records(users: Arc<InMemoryUserRepo>, records: Vec<RefreshTokenRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.token.clone(), r)).collect();
        Self {
            users,
            state: Arc::new(AsyncMutex::new(LedgerState { records })),
            fail_persist: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make the next `persist` in any transaction fail with a database error.
    pub fn fail_next_persist(&self) {
        self.fail_persist.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RefreshTokenRepo for InMemoryRefreshTokenRepo {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.records.clone();
        Ok(Box::new(InMemoryLedgerTx {
            users: self.users.clone(),
            fail_persist: self.fail_persist.clone(),
            guard,
            staged,
            new_users: Vec::new(),
        }))
    }

    async fn find(&self, token: &str) -> AppResult<Option<RefreshTokenRecord>> {
        Ok(self.state.lock().await.records.get(token).cloned())
    }

    async fn count_active_for_user(&self, user_id: Uuid) -> AppResult<i64> {
        Ok(self
            .state
            .lock()
            .await
            .records
            .values()
            .filter(|r| r.user_id == user_id && r.is_active())
            .count() as i64)
    }
}

struct InMemoryLedgerTx {
    users: Arc<InMemoryUserRepo>,
    fail_persist: Arc<AtomicBool>,
    guard: OwnedMutexGuard<LedgerState>,
    staged: HashMap<String, RefreshTokenRecord>,
    /// Identities created in this transaction, visible to the store on commit.
    new_users: Vec<User>,
}

#[async_trait]
impl LedgerTx for InMemoryLedgerTx {
    async fn create_identity(&mut self, new_user: NewUser) -> AppResult<User> {
        let taken = self.new_users.iter().any(|u| u.email == new_user.email)
            || self
                .users
                .users
                .lock()
                .unwrap()
                .values()
                .any(|u| u.email == new_user.email);
        if taken {
            return Err(AppError::IdentityAlreadyExists);
        }

        let user = new_identity(new_user);
        self.new_users.push(user.clone());
        Ok(user)
    }

    async fn lock_identity(&mut self, user_id: Uuid) -> AppResult<bool> {
        // Yield so concurrent flows interleave up to the lock they already hold.
        tokio::task::yield_now().await;
        Ok(self.new_users.iter().any(|u| u.id == user_id) || self.users.exists(user_id))
    }

    async fn find(&mut self, token: &str) -> AppResult<Option<RefreshTokenRecord>> {
        Ok(self.staged.get(token).cloned())
    }

    async fn persist(&mut self, user_id: Uuid, token: &str) -> AppResult<RefreshTokenRecord> {
        if self.fail_persist.swap(false, Ordering::SeqCst) {
            return Err(AppError::Database("injected failure".into()));
        }
        if self.staged.contains_key(token) {
            return Err(AppError::DuplicateToken);
        }
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            token: token.to_string(),
            user_id,
            is_revoked: false,
            created_at: Some(chrono::Utc::now().naive_utc()),
        };
        self.staged.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn revoke(&mut self, token: &str) -> AppResult<bool> {
        match self.staged.get_mut(token) {
            Some(record) if !record.is_revoked => {
                record.is_revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(&mut self, user_id: Uuid) -> AppResult<u64> {
        let mut changed = 0;
        for record in self.staged.values_mut() {
            if record.user_id == user_id && !record.is_revoked {
                record.is_revoked = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let InMemoryLedgerTx {
            users,
            mut guard,
            staged,
            new_users,
            ..
        } = *self;
        {
            let mut users = users.users.lock().unwrap();
            for user in new_users {
                users.insert(user.id, user);
            }
        }
        guard.records = staged;
        Ok(())
    }
}

// ============================================================================
// RecordingNotifier
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum PushTarget {
    Identity(Uuid),
    Group(String),
    Everyone,
}

/// Notifier that records every push instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub pushes: Mutex<Vec<(PushTarget, String, Value)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events pushed to `user_id`, in order.
    pub fn events_for(&self, user_id: Uuid) -> Vec<(String, Value)> {
        self.pushes
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, _, _)| *target == PushTarget::Identity(user_id))
            .map(|(_, event, payload)| (event.clone(), payload.clone()))
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn push_to_identity(&self, user_id: Uuid, event: &str, payload: Value) {
        self.pushes.lock().unwrap().push((
            PushTarget::Identity(user_id),
            event.to_string(),
            payload,
        ));
    }

    fn push_to_group(&self, group: &str, event: &str, payload: Value) {
        self.pushes.lock().unwrap().push((
            PushTarget::Group(group.to_string()),
            event.to_string(),
            payload,
        ));
    }

    fn broadcast(&self, event: &str, payload: Value) {
        self.pushes
            .lock()
            .unwrap()
            .push((PushTarget::Everyone, event.to_string(), payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_refresh_token, create_test_user};

    #[tokio::test]
    async fn test_uncommitted_ledger_tx_rolls_back() {
        let user = create_test_user(|_| {});
        let user_id = user.id;
        let users = Arc::new(InMemoryUserRepo::with_users(vec![user]));
        let record = create_test_refresh_token(user_id, |_| {});
        let ledger = InMemoryRefreshTokenRepo::with_records(users, vec![record.clone()]);

        {
            let mut tx = ledger.begin().await.unwrap();
            assert!(tx.revoke(&record.token).await.unwrap());
            tx.persist(user_id, "other").await.unwrap();
        }

        assert!(!ledger.find(&record.token).await.unwrap().unwrap().is_revoked);
        assert!(ledger.find("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ledger_tx_rejects_duplicate_token() {
        let users = Arc::new(InMemoryUserRepo::new());
        let ledger = InMemoryRefreshTokenRepo::new(users);
        let user_id = Uuid::new_v4();

        let mut tx = ledger.begin().await.unwrap();
        tx.persist(user_id, "dup").await.unwrap();
        let err = tx.persist(user_id, "dup").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateToken));
    }

    #[tokio::test]
    async fn test_identity_created_in_tx_exists_only_after_commit() {
        let users = Arc::new(InMemoryUserRepo::new());
        let ledger = InMemoryRefreshTokenRepo::new(users.clone());
        let new_user = || NewUser {
            email: "staged@x.com".into(),
            password_hash: "hash".into(),
            name: "Staged".into(),
        };

        {
            let mut tx = ledger.begin().await.unwrap();
            let user = tx.create_identity(new_user()).await.unwrap();
            assert!(tx.lock_identity(user.id).await.unwrap());
            let err = tx.create_identity(new_user()).await.unwrap_err();
            assert!(matches!(err, AppError::IdentityAlreadyExists));
        }
        assert!(users.find_by_email("staged@x.com").await.unwrap().is_none());

        let mut tx = ledger.begin().await.unwrap();
        let user = tx.create_identity(new_user()).await.unwrap();
        tx.commit().await.unwrap();
        assert!(users.exists(user.id));
    }
}
