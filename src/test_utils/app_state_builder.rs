//! Builds a full `AppState` over in-memory repositories for HTTP-level tests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt::TokenCodec,
        realtime::SessionHub,
        use_cases::{auth::AuthUseCases, user::UserUseCases},
    },
    domain::entities::user::User,
    infra::config::AppConfig,
    test_utils::{InMemoryRefreshTokenRepo, InMemoryUserRepo, test_codec, test_hasher},
};

/// # Example
///
/// ```ignore
/// let user = create_test_user(|u| u.email = "a@x.com".to_string());
/// let builder = TestAppStateBuilder::new().with_user(user);
/// let token = builder.codec().issue(user_id, SigningDomain::Access)?;
/// let app_state = builder.build();
/// ```
pub struct TestAppStateBuilder {
    users: Arc<InMemoryUserRepo>,
    ledger: Arc<InMemoryRefreshTokenRepo>,
    codec: TokenCodec,
    session_hub: Option<Arc<SessionHub>>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        let users = Arc::new(InMemoryUserRepo::new());
        let ledger = Arc::new(InMemoryRefreshTokenRepo::new(users.clone()));
        Self {
            users,
            ledger,
            codec: test_codec(),
            session_hub: None,
        }
    }

    pub fn with_user(self, user: User) -> Self {
        self.users.users.lock().unwrap().insert(user.id, user);
        self
    }

    /// Share a hub with the test so it can observe pushes.
    pub fn with_session_hub(mut self, hub: Arc<SessionHub>) -> Self {
        self.session_hub = Some(hub);
        self
    }

    /// Codec matching the one the built state verifies with.
    pub fn codec(&self) -> TokenCodec {
        self.codec.clone()
    }

    pub fn users(&self) -> Arc<InMemoryUserRepo> {
        self.users.clone()
    }

    pub fn ledger(&self) -> Arc<InMemoryRefreshTokenRepo> {
        self.ledger.clone()
    }

    pub fn build(self) -> AppState {
        let session_hub = self
            .session_hub
            .unwrap_or_else(|| Arc::new(SessionHub::new(self.codec.clone())));

        let auth_use_cases = AuthUseCases::new(
            self.users.clone(),
            self.ledger.clone(),
            self.codec.clone(),
            test_hasher(),
            session_hub.clone(),
        );
        let user_use_cases = UserUseCases::new(self.users.clone(), session_hub.clone());

        AppState {
            config: Arc::new(test_config()),
            auth_use_cases: Arc::new(auth_use_cases),
            user_use_cases: Arc::new(user_use_cases),
            codec: self.codec,
            session_hub,
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        jwt_secret: SecretString::new("test-access-secret".into()),
        access_token_ttl: Duration::minutes(15),
        jwt_refresh_secret: SecretString::new("test-refresh-secret".into()),
        refresh_token_ttl: Duration::days(30),
        jwt_secondary_secret: SecretString::new("test-secondary-secret".into()),
        secondary_token_ttl: Duration::hours(1),
        bcrypt_cost: 4,
    }
}
