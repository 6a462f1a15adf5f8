use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::Meta;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Too many submissions. Please try again later.")]
    RateLimited,

    #[error("Not Found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Maximum {max} files per order")]
    TooManyFiles { max: usize },

    #[error("File too large (max {max_bytes} bytes)")]
    FileTooLarge { max_bytes: usize },

    #[error("{0}")]
    InvalidFilename(String),

    #[error("Order code already in use")]
    DuplicateOrderCode,

    #[error("Database error")]
    Db(#[from] sea_orm::DbErr),

    #[error("Database error")]
    Sql(#[from] sqlx::Error),

    #[error("Storage error")]
    Blob(String),

    #[error("File already exists")]
    BlobExists(String),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::TooManyFiles { .. }
            | AppError::FileTooLarge { .. }
            | AppError::InvalidFilename(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BlobExists(_) => StatusCode::CONFLICT,
            AppError::DuplicateOrderCode
            | AppError::Db(_)
            | AppError::Sql(_)
            | AppError::Blob(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a caller. Storage failures collapse to a generic text.
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Something went wrong. Please try again.".to_string()
        } else {
            self.to_string()
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    error: String,
    meta: Meta,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.public_message();
        let body = ErrorBody {
            success: false,
            error: message.clone(),
            message,
            meta: Meta::empty(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
