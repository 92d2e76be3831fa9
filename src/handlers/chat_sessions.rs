use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::auth_middleware;
use crate::models::auth::Claims;
use crate::models::chat::*;
use crate::models::feedback::{MAX_RATING, MIN_RATING};
use crate::models::system_log::{LogCategory, LogLevel, NewSystemLog};
use crate::services::{PromptSystem, SystemLogService};
use crate::extract::{Json, Path};
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, post, Router},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub fn chat_session_routes() -> Router {
    Router::new()
        .route("/api/chat/sessions", get(list_sessions).post(start_session))
        .route("/api/chat/sessions/:id/messages", post(post_message))
        .route("/api/chat/sessions/:id/end", post(end_session))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn start_session(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartSessionRequest>,
) -> ApiResult<(StatusCode, Json<ChatSession>)> {
    let student_id = super::caller_id(&claims)?;

    let session = sqlx::query_as::<_, ChatSession>(
        r#"
        INSERT INTO chat_sessions (id, student_id, session_type, status, tags, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(payload.session_type)
    .bind(SessionStatus::Active)
    .bind(&payload.tags)
    .fetch_one(&state.db_pool)
    .await?;

    tracing::info!(session_id = %session.id, session_type = %session.session_type, "chat session started");
    Ok((StatusCode::CREATED, Json(session)))
}

async fn list_sessions(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<ChatSession>>> {
    let student_id = super::caller_id(&claims)?;
    let sessions = sqlx::query_as::<_, ChatSession>(
        "SELECT * FROM chat_sessions WHERE student_id = $1 ORDER BY created_at DESC",
    )
    .bind(student_id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(sessions))
}

/// The session's owner and staff may act on it; for anyone else it does not exist.
async fn accessible_session(state: &AppState, claims: &Claims, id: Uuid) -> ApiResult<ChatSession> {
    let caller = super::caller_id(claims)?;
    let session = sqlx::query_as::<_, ChatSession>("SELECT * FROM chat_sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?;

    match session {
        Some(session) if session.student_id == caller || claims.role.is_staff() => Ok(session),
        _ => Err(ApiError::NotFound("Chat session not found".to_string())),
    }
}

async fn post_message(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(ApiError::Validation("Message content is required".to_string()));
    }

    let session = accessible_session(&state, &claims, id).await?;
    if session.status != SessionStatus::Active {
        return Err(ApiError::Conflict("Chat session has ended".to_string()));
    }

    let language = payload
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("en");

    let message = sqlx::query_as::<_, ChatMessage>(
        r#"
        INSERT INTO chat_messages (id, session_id, sender, content, language, timestamp)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session.id)
    .bind(payload.sender)
    .bind(content)
    .bind(language)
    .fetch_one(&state.db_pool)
    .await?;

    if payload.sender == Sender::Student && PromptSystem::detect_crisis_keywords(content) {
        tracing::warn!(session_id = %session.id, "crisis keywords detected in chat session");
        SystemLogService::record_detached(
            &state.db_pool,
            NewSystemLog::new(
                LogLevel::Critical,
                LogCategory::Chat,
                format!("Crisis keywords detected in {} session", session.session_type),
            )
            .user(Some(session.student_id))
            .endpoint("POST /api/chat/sessions/:id/messages"),
        );
    }

    Ok((StatusCode::CREATED, Json(message)))
}

async fn end_session(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EndSessionRequest>,
) -> ApiResult<Json<ChatSession>> {
    if payload.status == SessionStatus::Active {
        return Err(ApiError::Validation(
            "A session can only end as completed or abandoned".to_string(),
        ));
    }
    if let Some(score) = payload.satisfaction {
        if !(MIN_RATING..=MAX_RATING).contains(&score) {
            return Err(ApiError::Validation(format!(
                "Satisfaction must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
    }
    if payload.duration.is_some_and(|d| d < 0) {
        return Err(ApiError::Validation("Duration cannot be negative".to_string()));
    }

    let session = accessible_session(&state, &claims, id).await?;
    if session.status != SessionStatus::Active {
        return Err(ApiError::Conflict("Chat session has already ended".to_string()));
    }

    // Minutes since the session started unless the client measured it
    let duration = payload.duration.unwrap_or_else(|| {
        let minutes = (Utc::now() - session.created_at).num_minutes().max(0);
        i32::try_from(minutes).unwrap_or(i32::MAX)
    });

    let ended = sqlx::query_as::<_, ChatSession>(
        r#"
        UPDATE chat_sessions
        SET status = $2, satisfaction = $3, mood = $4, duration = $5, updated_at = NOW()
        WHERE id = $1 AND status = $6
        RETURNING *
        "#,
    )
    .bind(session.id)
    .bind(payload.status)
    .bind(payload.satisfaction)
    .bind(payload.mood)
    .bind(duration)
    .bind(SessionStatus::Active)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| ApiError::Conflict("Chat session has already ended".to_string()))?;

    tracing::info!(session_id = %ended.id, status = %ended.status, duration, "chat session ended");
    Ok(Json(ended))
}
