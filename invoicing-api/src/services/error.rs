use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    Validation(String),

    /// Entity absent or not owned by the caller's workspace.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Raised by the store when a generated access token is already taken.
    #[error("Access token collision")]
    AccessTokenCollision,
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::from(e),
            ServiceError::Storage(e) => AppError::InternalError(anyhow::anyhow!("Storage error: {}", e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::NotFound(what) => {
                AppError::NotFound(anyhow::anyhow!("{} not found", what))
            }
            ServiceError::InvalidState(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Duplicate(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Unauthorized(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            ServiceError::AccessTokenCollision => AppError::InternalError(anyhow::anyhow!(
                "Could not generate a unique access token"
            )),
        }
    }
}
