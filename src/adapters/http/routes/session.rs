use axum::{Json, Router, routing::get};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    adapters::http::{
        app_state::AppState,
        guard::{AccessClaims, Authenticated, GuardDomain, SecondaryClaims},
    },
    app_error::AppResult,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    id: Uuid,
    issued_at: i64,
    expires_at: i64,
}

impl<D: GuardDomain> From<Authenticated<D>> for SessionResponse {
    fn from(auth: Authenticated<D>) -> Self {
        Self {
            id: auth.user_id,
            issued_at: auth.claims.iat,
            expires_at: auth.claims.exp,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(primary_session))
        .route("/service", get(secondary_session))
}

/// GET /api/session
async fn primary_session(auth: AccessClaims) -> AppResult<Json<SessionResponse>> {
    Ok(Json(auth.into()))
}

/// GET /api/session/service
async fn secondary_session(auth: SecondaryClaims) -> AppResult<Json<SessionResponse>> {
    Ok(Json(auth.into()))
}
