use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::*;
use crate::models::system_log::{LogCategory, NewSystemLog};
use crate::services::jwt::TokenSubject;
use crate::services::SystemLogService;
use crate::extract::Json;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, post, Router},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn auth_routes() -> Router {
    let protected = Router::new()
        .route("/api/auth/verify", get(verify_token))
        .layer(axum::middleware::from_fn(auth_middleware));

    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .merge(protected)
}

fn issue_tokens(state: &AppState, user: User, message: &str) -> ApiResult<AuthResponse> {
    let pair = state
        .jwt
        .create_token_pair(&TokenSubject::from(&user))
        .map_err(|e| ApiError::Internal(format!("Failed to issue token: {}", e)))?;

    Ok(AuthResponse {
        success: true,
        message: message.to_string(),
        token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: UserResponse::from(user),
    })
}

async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();
    let username = payload.username.trim();

    if name.is_empty() || email.is_empty() || username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Name, email, username, and password are required".to_string(),
        ));
    }

    if !is_valid_email(&email) {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }

    // Staff accounts are provisioned with the create_admin tool
    let role = payload.role.unwrap_or(UserRole::Student);
    if role != UserRole::Student {
        tracing::warn!(role = %role, "self-registration with a staff role rejected");
        return Err(ApiError::Forbidden(
            "Only student accounts can be self-registered".to_string(),
        ));
    }

    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM users WHERE email = $1 OR username = $2")
            .bind(&email)
            .bind(username)
            .fetch_optional(&state.db_pool)
            .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "User with this email or username already exists".to_string(),
        ));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("Error hashing password: {}", e)))?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, name, email, username, password_hash, role, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, true, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(&email)
    .bind(username)
    .bind(&password_hash)
    .bind(role)
    .fetch_one(&state.db_pool)
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    SystemLogService::record_detached(
        &state.db_pool,
        NewSystemLog::info(LogCategory::Auth, format!("New {} registered", user.role))
            .user(Some(user.id))
            .endpoint("POST /api/auth/register"),
    );

    let response = issue_tokens(&state, user, "User registered successfully")?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let password = payload
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::Validation("Password is required".to_string()))?;

    let identifier = payload
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .or_else(|| {
            payload
                .username
                .as_deref()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
        })
        .ok_or_else(|| ApiError::Validation("Email or username is required".to_string()))?;

    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE (email = $1 OR username = $1) AND is_active = true",
    )
    .bind(&identifier)
    .fetch_optional(&state.db_pool)
    .await?;

    let verified = match &user {
        Some(user) => verify(password, &user.password_hash)
            .map_err(|e| ApiError::Internal(format!("Error verifying password: {}", e)))?,
        None => false,
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::warn!(identifier = %identifier, "failed login attempt");
            SystemLogService::record_detached(
                &state.db_pool,
                NewSystemLog::warning(LogCategory::Auth, format!("Failed login for {}", identifier))
                    .endpoint("POST /api/auth/login")
                    .error_code("INVALID_CREDENTIALS"),
            );
            return Err(ApiError::Validation("Invalid credentials".to_string()));
        }
    };

    tracing::info!(user_id = %user.id, "user logged in");
    SystemLogService::record_detached(
        &state.db_pool,
        NewSystemLog::info(LogCategory::Auth, "User logged in")
            .user(Some(user.id))
            .endpoint("POST /api/auth/login"),
    );

    Ok(Json(issue_tokens(&state, user, "Login successful")?))
}

async fn refresh(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let claims = state
        .jwt
        .verify(&payload.refresh_token, TokenType::Refresh)
        .map_err(|e| {
            tracing::warn!("refresh token rejected: {}", e);
            ApiError::Unauthorized("Invalid or expired refresh token".to_string())
        })?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired refresh token".to_string()))?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = true")
        .bind(user_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    Ok(Json(issue_tokens(&state, user, "Token refreshed")?))
}

async fn verify_token(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Value>> {
    let user_id = super::caller_id(&claims)?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = true")
        .bind(user_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "user": UserResponse::from(user),
    })))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    async fn test_register_then_login(pool: PgPool) {
        let state = state_with_pool(pool);
        let registration = json!({
            "name": "Asha Verma",
            "email": "  Asha@University.edu ",
            "username": "asha",
            "password": "secret123"
        });

        let response = send(state.clone(), "POST", "/api/auth/register", None, Some(registration.clone())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["user"]["email"], "asha@university.edu");
        assert_eq!(body["user"]["role"], "student");

        let response = send(state.clone(), "POST", "/api/auth/register", None, Some(registration)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let login = json!({"username": "asha", "password": "secret123"});
        let response = send(state.clone(), "POST", "/api/auth/login", None, Some(login)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let token = json_body(response).await["token"].as_str().unwrap().to_string();

        let response = send(state.clone(), "GET", "/api/auth/verify", Some(&token), None).await;
        assert_eq!(json_body(response).await["user"]["username"], "asha");

        let wrong = json!({"email": "asha@university.edu", "password": "not-it"});
        let response = send(state, "POST", "/api/auth/login", None, Some(wrong)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
