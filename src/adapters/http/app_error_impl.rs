use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        // Log the error before it gets converted into a status response.
        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let code = self.code();
        match self {
            AppError::InvalidInput(msg) => error_resp(status, code, Some(msg)),
            _ => error_resp(status, code, None),
        }
    }
}

fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::IdentityAlreadyExists | AppError::DuplicateToken => StatusCode::CONFLICT,
        AppError::TokenNotProvided => StatusCode::FORBIDDEN,
        AppError::InvalidCredentials
        | AppError::Unauthorized
        | AppError::InvalidRefreshToken
        | AppError::RefreshTokenExpired
        | AppError::RefreshTokenRevoked
        | AppError::IdentityNotFound => StatusCode::UNAUTHORIZED,
        AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound => StatusCode::NOT_FOUND,
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
