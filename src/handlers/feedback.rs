use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::auth_middleware;
use crate::models::appointment::{Appointment, AppointmentStatus};
use crate::models::auth::{Claims, UserRole};
use crate::models::feedback::*;
use crate::models::system_log::{LogCategory, NewSystemLog};
use crate::services::SystemLogService;
use crate::extract::Json;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, post, Router},
};
use std::sync::Arc;
use uuid::Uuid;

pub fn feedback_routes() -> Router {
    Router::new()
        .route("/api/feedback/submit", post(submit_feedback))
        .route("/api/feedback", get(list_feedback))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn submit_feedback(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitFeedbackRequest>,
) -> ApiResult<(StatusCode, Json<Feedback>)> {
    if !payload.rating_is_valid() {
        return Err(ApiError::Validation(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }

    let caller = super::caller_id(&claims)?;
    let student_id = payload.student_id.unwrap_or(caller);
    if claims.role == UserRole::Student && student_id != caller {
        return Err(ApiError::Forbidden(
            "Students can only submit their own feedback".to_string(),
        ));
    }

    let mut tx = state.db_pool.begin().await?;

    let appointment = sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE id = $1 FOR UPDATE",
    )
    .bind(payload.appointment_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Appointment not found".to_string()))?;

    if appointment.student_id != student_id || appointment.counselor_id != payload.counselor_id {
        return Err(ApiError::Validation(
            "Appointment does not belong to this student and counselor".to_string(),
        ));
    }
    if appointment.status == AppointmentStatus::Cancelled {
        return Err(ApiError::Conflict(
            "Cannot leave feedback for a cancelled appointment".to_string(),
        ));
    }

    let already: Option<Uuid> = sqlx::query_scalar("SELECT id FROM feedback WHERE appointment_id = $1")
        .bind(appointment.id)
        .fetch_optional(&mut *tx)
        .await?;
    if already.is_some() {
        return Err(ApiError::Conflict(
            "Feedback already submitted for this appointment".to_string(),
        ));
    }

    let feedback = sqlx::query_as::<_, Feedback>(
        r#"
        INSERT INTO feedback (id, student_id, counselor_id, appointment_id, rating, comment, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(payload.counselor_id)
    .bind(appointment.id)
    .bind(payload.rating)
    .bind(payload.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE appointments SET status = $2, updated_at = NOW() WHERE id = $1 AND status = $3")
        .bind(appointment.id)
        .bind(AppointmentStatus::Completed)
        .bind(AppointmentStatus::Booked)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(feedback_id = %feedback.id, appointment_id = %appointment.id, "feedback submitted");
    SystemLogService::record_detached(
        &state.db_pool,
        NewSystemLog::info(
            LogCategory::Appointment,
            format!("Feedback submitted with rating {}", feedback.rating),
        )
        .user(Some(caller))
        .endpoint("POST /api/feedback/submit"),
    );

    Ok((StatusCode::CREATED, Json(feedback)))
}

async fn list_feedback(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Feedback>>> {
    let caller = super::caller_id(&claims)?;

    let feedback = match claims.role {
        UserRole::Admin => {
            sqlx::query_as::<_, Feedback>("SELECT * FROM feedback ORDER BY created_at DESC")
                .fetch_all(&state.db_pool)
                .await?
        }
        UserRole::Counselor => {
            sqlx::query_as::<_, Feedback>(
                "SELECT * FROM feedback WHERE counselor_id = $1 ORDER BY created_at DESC",
            )
            .bind(caller)
            .fetch_all(&state.db_pool)
            .await?
        }
        UserRole::Student => {
            sqlx::query_as::<_, Feedback>(
                "SELECT * FROM feedback WHERE student_id = $1 ORDER BY created_at DESC",
            )
            .bind(caller)
            .fetch_all(&state.db_pool)
            .await?
        }
    };

    Ok(Json(feedback))
}

#[cfg(test)]
mod tests {
    use crate::models::auth::UserRole;
    use crate::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    async fn booked_appointment(pool: &PgPool, student: Uuid, counselor: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO appointments (id, student_id, counselor_id, starts_at) VALUES ($1, $2, $3, NOW())",
        )
        .bind(id)
        .bind(student)
        .bind(counselor)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_feedback_completes_appointment_once(pool: PgPool) {
        let state = state_with_pool(pool.clone());
        let (student, token) = create_user(&state, "asha", UserRole::Student).await;
        let (counselor, counselor_token) = create_user(&state, "dr_rao", UserRole::Counselor).await;
        let appointment = booked_appointment(&pool, student, counselor).await;

        let body = json!({
            "counselorId": counselor,
            "appointmentId": appointment,
            "rating": 5,
            "comment": "  Really helped  "
        });
        let response = send(state.clone(), "POST", "/api/feedback/submit", Some(&token), Some(body.clone())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let feedback = json_body(response).await;
        assert_eq!(feedback["rating"], 5);
        assert_eq!(feedback["comment"], "Really helped");

        let status: String = sqlx::query_scalar("SELECT status FROM appointments WHERE id = $1")
            .bind(appointment)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "completed");

        let response = send(state.clone(), "POST", "/api/feedback/submit", Some(&token), Some(body)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(state, "GET", "/api/feedback", Some(&counselor_token), None).await;
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_feedback_checks_the_appointment(pool: PgPool) {
        let state = state_with_pool(pool.clone());
        let (student, token) = create_user(&state, "asha", UserRole::Student).await;
        let (counselor, _) = create_user(&state, "dr_rao", UserRole::Counselor).await;
        let (other_counselor, _) = create_user(&state, "dr_mehta", UserRole::Counselor).await;

        let unknown = json!({ "counselorId": counselor, "appointmentId": Uuid::new_v4(), "rating": 4 });
        let response = send(state.clone(), "POST", "/api/feedback/submit", Some(&token), Some(unknown)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let appointment = booked_appointment(&pool, student, counselor).await;
        let mismatched = json!({ "counselorId": other_counselor, "appointmentId": appointment, "rating": 4 });
        let response = send(state.clone(), "POST", "/api/feedback/submit", Some(&token), Some(mismatched)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        sqlx::query("UPDATE appointments SET status = 'cancelled' WHERE id = $1")
            .bind(appointment)
            .execute(&pool)
            .await
            .unwrap();
        let cancelled = json!({ "counselorId": counselor, "appointmentId": appointment, "rating": 4 });
        let response = send(state, "POST", "/api/feedback/submit", Some(&token), Some(cancelled)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
