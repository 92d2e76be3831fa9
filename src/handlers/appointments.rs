use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::auth_middleware;
use crate::models::appointment::*;
use crate::models::auth::{Claims, UserRole};
use crate::models::system_log::{LogCategory, NewSystemLog};
use crate::services::SystemLogService;
use crate::extract::{Json, Path};
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, patch, post, Router},
};
use std::sync::Arc;
use uuid::Uuid;

pub fn appointment_routes() -> Router {
    Router::new()
        .route("/api/appointments/book", post(book_appointment))
        .route("/api/appointments", get(list_appointments))
        .route("/api/appointments/:id", get(get_appointment))
        .route("/api/appointments/:id/status", patch(update_status))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn book_appointment(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BookAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let caller = super::caller_id(&claims)?;
    let student_id = payload.student_id.unwrap_or(caller);

    if claims.role == UserRole::Student && student_id != caller {
        return Err(ApiError::Forbidden(
            "Students can only book appointments for themselves".to_string(),
        ));
    }

    let counselor_role: Option<UserRole> =
        sqlx::query_scalar("SELECT role FROM users WHERE id = $1 AND is_active = true")
            .bind(payload.counselor_id)
            .fetch_optional(&state.db_pool)
            .await?;
    if counselor_role != Some(UserRole::Counselor) {
        return Err(ApiError::Validation("Counselor not found".to_string()));
    }

    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        INSERT INTO appointments (id, student_id, counselor_id, starts_at, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(payload.counselor_id)
    .bind(payload.starts_at)
    .bind(AppointmentStatus::default())
    .fetch_one(&state.db_pool)
    .await?;

    tracing::info!(appointment_id = %appointment.id, student_id = %student_id, "appointment booked");
    SystemLogService::record_detached(
        &state.db_pool,
        NewSystemLog::info(LogCategory::Appointment, "Appointment booked")
            .user(Some(caller))
            .endpoint("POST /api/appointments/book"),
    );

    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn list_appointments(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Appointment>>> {
    let caller = super::caller_id(&claims)?;

    let appointments = match claims.role {
        UserRole::Admin => {
            sqlx::query_as::<_, Appointment>("SELECT * FROM appointments ORDER BY starts_at DESC")
                .fetch_all(&state.db_pool)
                .await?
        }
        UserRole::Counselor => {
            sqlx::query_as::<_, Appointment>(
                "SELECT * FROM appointments WHERE counselor_id = $1 ORDER BY starts_at DESC",
            )
            .bind(caller)
            .fetch_all(&state.db_pool)
            .await?
        }
        UserRole::Student => {
            sqlx::query_as::<_, Appointment>(
                "SELECT * FROM appointments WHERE student_id = $1 ORDER BY starts_at DESC",
            )
            .bind(caller)
            .fetch_all(&state.db_pool)
            .await?
        }
    };

    Ok(Json(appointments))
}

/// Loads an appointment the caller may see; anything else reads as missing.
async fn visible_appointment(state: &AppState, claims: &Claims, id: Uuid) -> ApiResult<Appointment> {
    let caller = super::caller_id(claims)?;
    let appointment = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?;

    match appointment {
        Some(appointment) if claims.is_admin() || appointment.involves(caller) => Ok(appointment),
        _ => Err(ApiError::NotFound("Appointment not found".to_string())),
    }
}

async fn get_appointment(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(visible_appointment(&state, &claims, id).await?))
}

async fn update_status(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAppointmentStatusRequest>,
) -> ApiResult<Json<Appointment>> {
    let current = visible_appointment(&state, &claims, id).await?;

    if !current.status.can_transition_to(payload.status) {
        return Err(ApiError::Conflict(format!(
            "Cannot change appointment from {} to {}",
            current.status, payload.status
        )));
    }

    // The status guard in WHERE keeps concurrent updates from both succeeding
    let updated = sqlx::query_as::<_, Appointment>(
        r#"
        UPDATE appointments SET status = $2, updated_at = NOW()
        WHERE id = $1 AND status = $3
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.status)
    .bind(current.status)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| ApiError::Conflict("Appointment status changed concurrently".to_string()))?;

    SystemLogService::record_detached(
        &state.db_pool,
        NewSystemLog::info(
            LogCategory::Appointment,
            format!("Appointment {} marked {}", id, updated.status),
        )
        .user(claims.user_id())
        .endpoint("PATCH /api/appointments/:id/status"),
    );

    Ok(Json(updated))
}
