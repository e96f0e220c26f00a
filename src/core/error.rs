use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Category {0} not found")]
    CategoryNotFound(Uuid),

    #[error("Parent category {0} not found")]
    ParentNotFound(Uuid),

    #[error("A category cannot be its own parent")]
    SelfParent,

    #[error("Moving category {id} under {new_parent} would create a cycle")]
    Cycle { id: Uuid, new_parent: Uuid },

    #[error("Category level {level} exceeds the maximum depth of {max}")]
    MaxDepthExceeded { level: i32, max: u32 },

    #[error("Category {0} still has children")]
    HasChildren(Uuid),

    #[error("Category name is required")]
    NameRequired,

    #[error("Category name is {len} characters, maximum is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("Category description is {len} characters, maximum is {max}")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::CategoryNotFound(_) | AppError::ParentNotFound(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::SelfParent | AppError::Cycle { .. } | AppError::HasChildren(_) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::MaxDepthExceeded { .. }
            | AppError::NameRequired
            | AppError::NameTooLong { .. }
            | AppError::DescriptionTooLong { .. }
            | AppError::Validation(_)
            | AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        let body = Json(ApiResponse::<()>::error(Some(message.clone()), Some(vec![message])));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
