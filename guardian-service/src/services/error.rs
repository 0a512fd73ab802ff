use service_core::error::AppError;
use thiserror::Error;

use crate::db::RepositoryError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code expired or not found")]
    ChallengeNotFound,

    #[error("Too many failed verification attempts")]
    TooManyAttempts,

    #[error("User not found")]
    UserNotFound,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Failed to generate tokens")]
    TokenIssuance,

    #[error("Email error: {0}")]
    Email(String),

    #[error("File exceeds the {0} byte upload limit")]
    PayloadTooLarge(usize),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Repository(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Redis(e) => AppError::RedisError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidCredentials
            | ServiceError::InvalidCode
            | ServiceError::ChallengeNotFound
            | ServiceError::TooManyAttempts => AppError::AuthError(anyhow::anyhow!(message)),
            ServiceError::InvalidToken => AppError::Unauthorized(anyhow::anyhow!(message)),
            ServiceError::EmailAlreadyRegistered => AppError::Conflict(anyhow::anyhow!(message)),
            ServiceError::UserNotFound | ServiceError::NotFound(_) => {
                AppError::NotFound(anyhow::anyhow!(message))
            }
            ServiceError::Forbidden(_) => AppError::Forbidden(anyhow::anyhow!(message)),
            ServiceError::MissingField(_) | ServiceError::Validation(_) => {
                AppError::BadRequest(anyhow::anyhow!(message))
            }
            ServiceError::TokenIssuance => AppError::InternalError(anyhow::anyhow!(message)),
            ServiceError::Email(e) => AppError::EmailError(e),
            ServiceError::PayloadTooLarge(_) => AppError::PayloadTooLarge(anyhow::anyhow!(message)),
            ServiceError::Storage(e) => AppError::InternalError(anyhow::Error::new(e)),
        }
    }
}
