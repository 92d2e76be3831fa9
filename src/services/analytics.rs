// Aggregate queries behind the admin/counselor dashboards.
// Each dashboard fans its queries out concurrently on the pool.

use crate::models::analytics::*;
use sqlx::PgPool;

pub const DEFAULT_FEED_LIMIT: i64 = 20;
pub const MAX_FEED_LIMIT: i64 = 100;

pub struct AnalyticsService;

async fn count(pool: &PgPool, sql: &'static str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await
}

async fn average(pool: &PgPool, sql: &'static str) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar::<_, f64>(sql).fetch_one(pool).await
}

async fn label_counts(pool: &PgPool, sql: &'static str) -> Result<Vec<LabelCount>, sqlx::Error> {
    sqlx::query_as::<_, LabelCount>(sql).fetch_all(pool).await
}

pub fn clamp_feed_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT)
}

impl AnalyticsService {
    pub async fn overview(pool: &PgPool) -> Result<OverviewStats, sqlx::Error> {
        let (
            total_users,
            active_users,
            total_appointments,
            pending_appointments,
            total_chat_sessions,
            active_chat_sessions,
            total_assessments,
            average_rating,
        ) = tokio::try_join!(
            count(pool, "SELECT COUNT(*) FROM users"),
            count(pool, "SELECT COUNT(*) FROM users WHERE role = 'student'"),
            count(pool, "SELECT COUNT(*) FROM appointments"),
            count(pool, "SELECT COUNT(*) FROM appointments WHERE status = 'booked'"),
            count(pool, "SELECT COUNT(*) FROM chat_sessions"),
            count(pool, "SELECT COUNT(*) FROM chat_sessions WHERE status = 'active'"),
            count(pool, "SELECT COUNT(*) FROM assessments"),
            average(pool, "SELECT COALESCE(AVG(rating), 0)::float8 FROM feedback"),
        )?;

        Ok(OverviewStats {
            total_users,
            active_users,
            total_appointments,
            pending_appointments,
            total_chat_sessions,
            active_chat_sessions,
            total_assessments,
            average_rating,
        })
    }

    pub async fn user_trends(pool: &PgPool, period: TrendPeriod) -> Result<Vec<DailyCount>, sqlx::Error> {
        sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT EXTRACT(YEAR FROM created_at)::int AS year,
                   EXTRACT(MONTH FROM created_at)::int AS month,
                   EXTRACT(DAY FROM created_at)::int AS day,
                   COUNT(*) AS count
            FROM users
            WHERE created_at >= NOW() - make_interval(days => $1)
            GROUP BY 1, 2, 3
            ORDER BY 1, 2, 3
            "#,
        )
        .bind(period.days())
        .fetch_all(pool)
        .await
    }

    pub async fn chat(pool: &PgPool) -> Result<ChatAnalytics, sqlx::Error> {
        let (session_types, average_duration, satisfaction_scores, mood_distribution, language_usage) = tokio::try_join!(
            label_counts(
                pool,
                "SELECT session_type AS label, COUNT(*) AS count FROM chat_sessions GROUP BY session_type ORDER BY count DESC"
            ),
            average(pool, "SELECT COALESCE(AVG(duration), 0)::float8 FROM chat_sessions"),
            label_counts(
                pool,
                "SELECT satisfaction::text AS label, COUNT(*) AS count FROM chat_sessions WHERE satisfaction IS NOT NULL GROUP BY satisfaction ORDER BY satisfaction"
            ),
            label_counts(
                pool,
                "SELECT mood AS label, COUNT(*) AS count FROM chat_sessions WHERE mood IS NOT NULL GROUP BY mood ORDER BY count DESC"
            ),
            label_counts(
                pool,
                "SELECT language AS label, COUNT(*) AS count FROM chat_messages GROUP BY language ORDER BY count DESC"
            ),
        )?;

        Ok(ChatAnalytics {
            session_types,
            average_duration,
            satisfaction_scores,
            mood_distribution,
            language_usage,
        })
    }

    pub async fn assessments(pool: &PgPool) -> Result<AssessmentAnalytics, sqlx::Error> {
        let recent = sqlx::query_as::<_, RecentAssessment>(
            r#"
            SELECT a.id, a.type AS assessment_type, a.total_score, a.severity, a.completed_at,
                   a.student_id, u.name AS student_name, u.email AS student_email
            FROM assessments a
            LEFT JOIN users u ON u.id = a.student_id
            ORDER BY a.completed_at DESC
            LIMIT 10
            "#,
        )
        .fetch_all(pool);

        let trends = sqlx::query_as::<_, ScoreTrend>(
            r#"
            SELECT EXTRACT(YEAR FROM completed_at)::int AS year,
                   EXTRACT(MONTH FROM completed_at)::int AS month,
                   EXTRACT(DAY FROM completed_at)::int AS day,
                   AVG(total_score)::float8 AS avg_score,
                   COUNT(*) AS count
            FROM assessments
            GROUP BY 1, 2, 3
            ORDER BY 1, 2, 3
            "#,
        )
        .fetch_all(pool);

        let (assessment_types, severity_distribution, recent_assessments, score_trends) = tokio::try_join!(
            label_counts(
                pool,
                "SELECT type AS label, COUNT(*) AS count FROM assessments GROUP BY type ORDER BY count DESC"
            ),
            label_counts(
                pool,
                "SELECT severity AS label, COUNT(*) AS count FROM assessments GROUP BY severity ORDER BY count DESC"
            ),
            recent,
            trends,
        )?;

        Ok(AssessmentAnalytics {
            assessment_types,
            severity_distribution,
            recent_assessments,
            score_trends,
        })
    }

    pub async fn appointments(pool: &PgPool) -> Result<AppointmentAnalytics, sqlx::Error> {
        let monthly = sqlx::query_as::<_, MonthlyCount>(
            r#"
            SELECT EXTRACT(YEAR FROM created_at)::int AS year,
                   EXTRACT(MONTH FROM created_at)::int AS month,
                   COUNT(*) AS count
            FROM appointments
            GROUP BY 1, 2
            ORDER BY 1, 2
            "#,
        )
        .fetch_all(pool);

        let workload = sqlx::query_as::<_, CounselorWorkload>(
            r#"
            SELECT a.counselor_id, u.name AS counselor_name, COUNT(*) AS appointment_count
            FROM appointments a
            JOIN users u ON u.id = a.counselor_id
            GROUP BY a.counselor_id, u.name
            ORDER BY appointment_count DESC
            "#,
        )
        .fetch_all(pool);

        let (status_distribution, monthly_trends, counselor_workload, completion_rate) = tokio::try_join!(
            label_counts(
                pool,
                "SELECT status AS label, COUNT(*) AS count FROM appointments GROUP BY status ORDER BY count DESC"
            ),
            monthly,
            workload,
            average(
                pool,
                "SELECT COALESCE(100.0 * COUNT(*) FILTER (WHERE status = 'completed') / NULLIF(COUNT(*), 0), 0)::float8 FROM appointments"
            ),
        )?;

        Ok(AppointmentAnalytics {
            status_distribution,
            monthly_trends,
            counselor_workload,
            completion_rate,
        })
    }

    pub async fn system_health(pool: &PgPool) -> Result<SystemHealth, sqlx::Error> {
        let (error_count, system_load, average_response_time, active_users) = tokio::try_join!(
            count(pool, "SELECT COUNT(*) FROM system_logs WHERE level = 'error'"),
            label_counts(
                pool,
                "SELECT level AS label, COUNT(*) AS count FROM system_logs WHERE category = 'system' GROUP BY level ORDER BY count DESC"
            ),
            average(
                pool,
                "SELECT COALESCE(AVG(response_time_ms), 0)::float8 FROM system_logs WHERE response_time_ms IS NOT NULL"
            ),
            count(pool, "SELECT COUNT(*) FROM users WHERE role = 'student'"),
        )?;

        Ok(SystemHealth {
            error_count,
            system_load,
            average_response_time,
            active_users,
        })
    }

    pub async fn activity_feed(pool: &PgPool, limit: i64) -> Result<Vec<ActivityEntry>, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT l.id, l.level, l.category, l.message, l.timestamp,
                   l.endpoint, l.response_time_ms, l.error_code, l.user_id,
                   u.name AS user_name, u.email AS user_email, u.role AS user_role
            FROM system_logs l
            LEFT JOIN users u ON u.id = l.user_id
            ORDER BY l.timestamp DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
