use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, guard::AccessClaims},
    app_error::AppResult,
    application::use_cases::auth::TokenPair,
};

#[derive(Deserialize)]
struct RegisterPayload {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshPayload {
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    id: Uuid,
    access_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPairResponse {
    id: Uuid,
    access_token: String,
    refresh_token: String,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            id: pair.user_id,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
}

/// POST /api/auth/register
/// The refresh token is persisted but only the access token is returned.
async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> AppResult<impl IntoResponse> {
    let pair = app_state
        .auth_use_cases
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: pair.user_id,
            access_token: pair.access_token,
        }),
    ))
}

/// POST /api/auth/login
async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<impl IntoResponse> {
    let pair = app_state
        .auth_use_cases
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(TokenPairResponse::from(pair)))
}

/// POST /api/auth/refresh
async fn refresh(
    State(app_state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> AppResult<impl IntoResponse> {
    let pair = app_state
        .auth_use_cases
        .refresh(&payload.refresh_token)
        .await?;
    Ok(Json(TokenPairResponse::from(pair)))
}

/// POST /api/auth/logout
async fn logout(
    State(app_state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> AppResult<impl IntoResponse> {
    app_state
        .auth_use_cases
        .logout(&payload.refresh_token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/logout-all
async fn logout_all(
    State(app_state): State<AppState>,
    auth: AccessClaims,
) -> AppResult<impl IntoResponse> {
    app_state.auth_use_cases.logout_all(auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
