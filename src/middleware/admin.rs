use crate::error::ApiError;
use crate::models::auth::Claims;
use axum::{extract::Request, middleware::Next, response::Response};

/// Dashboards are limited to counselors and admins. Runs after `auth_middleware`.
pub async fn staff_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<Claims>() {
        Some(claims) if claims.role.is_staff() => Ok(next.run(request).await),
        Some(claims) => {
            tracing::warn!(user_id = %claims.sub, role = %claims.role, "staff route denied");
            Err(ApiError::Forbidden(
                "Access denied. Admin or counselor role required.".to_string(),
            ))
        }
        None => Err(ApiError::Unauthorized(
            "Authentication required for admin access.".to_string(),
        )),
    }
}
