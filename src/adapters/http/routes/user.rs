use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, guard::AccessClaims},
    app_error::AppResult,
    domain::entities::user::{User, UserUpdate},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfilePayload {
    name: Option<String>,
    profile_picture_url: Option<String>,
}

/// Public view of an identity; never carries the password hash.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    id: Uuid,
    email: String,
    name: String,
    is_active: bool,
    profile_picture_url: Option<String>,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_active: user.is_active,
            profile_picture_url: user.profile_picture_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).patch(update_me))
        .route("/me/deactivate", post(deactivate_me))
}

async fn get_me(
    State(app_state): State<AppState>,
    auth: AccessClaims,
) -> AppResult<impl IntoResponse> {
    let user = app_state.user_use_cases.get_profile(auth.user_id).await?;
    Ok(Json(ProfileResponse::from(user)))
}

async fn update_me(
    State(app_state): State<AppState>,
    auth: AccessClaims,
    Json(payload): Json<UpdateProfilePayload>,
) -> AppResult<impl IntoResponse> {
    let user = app_state
        .user_use_cases
        .update_profile(
            auth.user_id,
            UserUpdate {
                name: payload.name,
                profile_picture_url: payload.profile_picture_url,
            },
        )
        .await?;
    Ok(Json(ProfileResponse::from(user)))
}

async fn deactivate_me(
    State(app_state): State<AppState>,
    auth: AccessClaims,
) -> AppResult<impl IntoResponse> {
    app_state.user_use_cases.deactivate(auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
