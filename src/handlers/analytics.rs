use crate::error::ApiResult;
use crate::middleware::{admin::staff_middleware, auth::auth_middleware};
use crate::models::analytics::*;
use crate::services::analytics::clamp_feed_limit;
use crate::services::AnalyticsService;
use crate::extract::{Json, Query};
use crate::AppState;
use axum::{
    extract::Extension,
    routing::{get, Router},
};
use std::sync::Arc;

pub fn analytics_routes() -> Router {
    Router::new()
        .route("/api/analytics/overview", get(overview))
        .route("/api/analytics/users/trends", get(user_trends))
        .route("/api/analytics/chat/analytics", get(chat_analytics))
        .route("/api/analytics/assessments/analytics", get(assessment_analytics))
        .route("/api/analytics/appointments/analytics", get(appointment_analytics))
        .route("/api/analytics/system/health", get(system_health))
        .route("/api/analytics/activity/feed", get(activity_feed))
        .layer(axum::middleware::from_fn(staff_middleware))
        .layer(axum::middleware::from_fn(auth_middleware))
}

async fn overview(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Json<OverviewStats>> {
    Ok(Json(AnalyticsService::overview(&state.db_pool).await?))
}

async fn user_trends(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<TrendQuery>,
) -> ApiResult<Json<Vec<DailyCount>>> {
    let period = TrendPeriod::parse(query.period.as_deref());
    Ok(Json(AnalyticsService::user_trends(&state.db_pool, period).await?))
}

async fn chat_analytics(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Json<ChatAnalytics>> {
    Ok(Json(AnalyticsService::chat(&state.db_pool).await?))
}

async fn assessment_analytics(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Json<AssessmentAnalytics>> {
    Ok(Json(AnalyticsService::assessments(&state.db_pool).await?))
}

async fn appointment_analytics(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Json<AppointmentAnalytics>> {
    Ok(Json(AnalyticsService::appointments(&state.db_pool).await?))
}

async fn system_health(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Json<SystemHealth>> {
    Ok(Json(AnalyticsService::system_health(&state.db_pool).await?))
}

async fn activity_feed(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<Vec<ActivityEntry>>> {
    let limit = clamp_feed_limit(query.limit);
    Ok(Json(AnalyticsService::activity_feed(&state.db_pool, limit).await?))
}

#[cfg(test)]
mod tests {
    use crate::models::auth::UserRole;
    use crate::models::system_log::{LogCategory, LogLevel, NewSystemLog};
    use crate::services::SystemLogService;
    use crate::test_support::*;
    use axum::http::StatusCode;
    use sqlx::PgPool;
    use uuid::Uuid;

    async fn seed(pool: &PgPool, student: Uuid, counselor: Uuid) {
        for status in ["booked", "completed", "completed", "cancelled"] {
            sqlx::query(
                "INSERT INTO appointments (id, student_id, counselor_id, starts_at, status) VALUES ($1, $2, $3, NOW(), $4)",
            )
            .bind(Uuid::new_v4())
            .bind(student)
            .bind(counselor)
            .bind(status)
            .execute(pool)
            .await
            .unwrap();
        }

        let session = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO chat_sessions (id, student_id, session_type, duration, satisfaction, status, mood) VALUES ($1, $2, 'ai', 30, 4, 'completed', 'content')",
        )
        .bind(session)
        .bind(student)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO chat_messages (id, session_id, sender, content, language) VALUES ($1, $2, 'student', 'hi', 'hi')")
            .bind(Uuid::new_v4())
            .bind(session)
            .execute(pool)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO assessments (id, student_id, type, total_score, severity) VALUES ($1, $2, 'PHQ-9', 21, 'severe')",
        )
        .bind(Uuid::new_v4())
        .bind(student)
        .execute(pool)
        .await
        .unwrap();

        SystemLogService::record(
            pool,
            &NewSystemLog::new(LogLevel::Error, LogCategory::System, "GET /api/status failed with 500")
                .user(Some(student))
                .endpoint("GET /api/status")
                .response_time_ms(1500),
        )
        .await
        .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_dashboards_aggregate_seeded_data(pool: PgPool) {
        let state = state_with_pool(pool.clone());
        let (student, _) = create_user(&state, "asha", UserRole::Student).await;
        let (counselor, token) = create_user(&state, "dr_rao", UserRole::Counselor).await;
        seed(&pool, student, counselor).await;

        let get = |path: &'static str| {
            let state = state.clone();
            let token = token.clone();
            async move {
                let response = send(state, "GET", path, Some(&token), None).await;
                assert_eq!(response.status(), StatusCode::OK, "{}", path);
                json_body(response).await
            }
        };

        let overview = get("/api/analytics/overview").await;
        assert_eq!(overview["totalUsers"], 2);
        assert_eq!(overview["activeUsers"], 1);
        assert_eq!(overview["totalAppointments"], 4);
        assert_eq!(overview["pendingAppointments"], 1);
        assert_eq!(overview["totalAssessments"], 1);

        let trends = get("/api/analytics/users/trends?period=30d").await;
        assert_eq!(trends[0]["count"], 2);
        assert!(trends[0]["year"].is_number());

        let chat = get("/api/analytics/chat/analytics").await;
        assert_eq!(chat["averageDuration"], 30.0);
        assert_eq!(chat["moodDistribution"][0]["label"], "content");
        assert_eq!(chat["languageUsage"][0]["label"], "hi");

        let assessments = get("/api/analytics/assessments/analytics").await;
        assert_eq!(assessments["severityDistribution"][0]["label"], "severe");
        assert_eq!(assessments["recentAssessments"][0]["studentEmail"], "asha@university.edu");
        assert_eq!(assessments["scoreTrends"][0]["avgScore"], 21.0);

        let appointments = get("/api/analytics/appointments/analytics").await;
        assert_eq!(appointments["completionRate"], 50.0);
        assert_eq!(appointments["counselorWorkload"][0]["appointmentCount"], 4);
        assert_eq!(appointments["monthlyTrends"][0]["count"], 4);

        let health = get("/api/analytics/system/health").await;
        assert_eq!(health["errorCount"], 1);
        assert_eq!(health["averageResponseTime"], 1500.0);

        let feed = get("/api/analytics/activity/feed?limit=5").await;
        assert_eq!(feed[0]["userEmail"], "asha@university.edu");
        assert_eq!(feed[0]["userRole"], "student");
    }
}
