use std::sync::Arc;

use crate::{
    application::{
        jwt::TokenCodec,
        realtime::SessionHub,
        use_cases::{auth::AuthUseCases, user::UserUseCases},
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_use_cases: Arc<AuthUseCases>,
    pub user_use_cases: Arc<UserUseCases>,
    /// Used by the access guards and the WebSocket handshake.
    pub codec: TokenCodec,
    pub session_hub: Arc<SessionHub>,
}
