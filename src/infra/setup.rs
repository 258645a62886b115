use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::{
        ports::notifier::Notifier,
        realtime::SessionHub,
        use_cases::{
            auth::{AuthUseCases, RefreshTokenRepo},
            user::{UserRepo, UserUseCases},
        },
    },
    infra::{config::AppConfig, error::InfraError, postgres_persistence},
};

pub async fn init_app_state() -> Result<AppState, InfraError> {
    let config = AppConfig::from_env()?;

    let postgres_arc =
        Arc::new(postgres_persistence(&config.database_url, config.database_max_connections).await?);

    let codec = config.token_codec();
    let session_hub = Arc::new(SessionHub::new(codec.clone()));

    let user_repo_arc = postgres_arc.clone() as Arc<dyn UserRepo>;
    let ledger_arc = postgres_arc.clone() as Arc<dyn RefreshTokenRepo>;
    let notifier_arc = session_hub.clone() as Arc<dyn Notifier>;

    let auth_use_cases = AuthUseCases::new(
        user_repo_arc.clone(),
        ledger_arc,
        codec.clone(),
        config.password_hasher(),
        notifier_arc.clone(),
    );
    let user_use_cases = UserUseCases::new(user_repo_arc, notifier_arc);

    Ok(AppState {
        config: Arc::new(config),
        auth_use_cases: Arc::new(auth_use_cases),
        user_use_cases: Arc::new(user_use_cases),
        codec,
        session_hub,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "authcast=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    // File (structured JSON logs); console only if the file can't be created.
    let json_layer = File::create("app.log").ok().map(|file| {
        fmt::layer()
            .json()
            .with_writer(file)
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
