//! REST API module.
//!
//! Handlers for the board and hierarchy pages. Success bodies are the plain
//! resource; failures render as [`AppError`] `{ detail, code }` bodies.

mod hierarchy;
mod kanban;

pub use hierarchy::*;
pub use kanban::*;

use axum::Json;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::Deleted;

/// Response type shared by all handlers.
pub type ApiResult<T> = Result<Json<T>, AppError>;

/// Wrap a successful value.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(data))
}

/// Body returned after a successful delete.
pub fn deleted() -> ApiResult<Deleted> {
    success(Deleted { deleted: true })
}

/// Reject a blank required text field.
pub fn require(value: &str, message: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(())
}
