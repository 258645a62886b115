use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("An account with this email already exists")]
    IdentityAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token not provided")]
    TokenNotProvided,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    #[error("Refresh token revoked")]
    RefreshTokenRevoked,

    #[error("Identity not found")]
    IdentityNotFound,

    #[error("Duplicate token")]
    DuplicateToken,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::IdentityAlreadyExists => ErrorCode::IdentityAlreadyExists,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::TokenNotProvided => ErrorCode::TokenNotProvided,
            AppError::Unauthorized => ErrorCode::Unauthorized,
            AppError::InvalidRefreshToken => ErrorCode::InvalidRefreshToken,
            AppError::RefreshTokenExpired => ErrorCode::RefreshTokenExpired,
            AppError::RefreshTokenRevoked => ErrorCode::RefreshTokenRevoked,
            AppError::IdentityNotFound => ErrorCode::IdentityNotFound,
            AppError::DuplicateToken => ErrorCode::DuplicateToken,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Errors that mean "no credential was presented" rather than "credential rejected".
    pub fn is_forbidden(&self) -> bool {
        matches!(self, AppError::TokenNotProvided)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    DatabaseError,
    IdentityAlreadyExists,
    InvalidCredentials,
    TokenNotProvided,
    Unauthorized,
    InvalidRefreshToken,
    RefreshTokenExpired,
    RefreshTokenRevoked,
    IdentityNotFound,
    DuplicateToken,
    InvalidInput,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::IdentityAlreadyExists => "IDENTITY_ALREADY_EXISTS",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::TokenNotProvided => "TOKEN_NOT_PROVIDED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            ErrorCode::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
            ErrorCode::RefreshTokenRevoked => "REFRESH_TOKEN_REVOKED",
            ErrorCode::IdentityNotFound => "IDENTITY_NOT_FOUND",
            ErrorCode::DuplicateToken => "DUPLICATE_TOKEN",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
