use serde::{Deserialize, Serialize};

/// Errors returned by operation handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Call token error: {0}")]
    Token(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable code carried in error responses
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Storage(_) => "storage",
            ApiError::Upload(_) => "upload",
            ApiError::Token(_) => "token",
            ApiError::Internal(_) => "internal",
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error payload of a `response` frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&ApiError> for ErrorBody {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
