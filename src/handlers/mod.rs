// src/handlers/mod.rs
pub mod ai;
pub mod analytics;
pub mod appointments;
pub mod auth;
pub mod chat_sessions;
pub mod feedback;
pub mod status;

use crate::error::{ApiError, ApiResult};
use crate::models::auth::Claims;
use uuid::Uuid;

/// The authenticated caller's user id.
pub(crate) fn caller_id(claims: &Claims) -> ApiResult<Uuid> {
    claims
        .user_id()
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))
}
