use super::assessment::{AssessmentType, Severity};
use super::auth::UserRole;
use super::system_log::{LogCategory, LogLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendPeriod {
    Week,
    Month,
    Quarter,
}

impl TrendPeriod {
    /// `7d` and `30d` are recognised; anything else falls back to 90 days.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.unwrap_or("7d") {
            "7d" => TrendPeriod::Week,
            "30d" => TrendPeriod::Month,
            _ => TrendPeriod::Quarter,
        }
    }

    pub fn days(&self) -> i32 {
        match self {
            TrendPeriod::Week => 7,
            TrendPeriod::Month => 30,
            TrendPeriod::Quarter => 90,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyCount {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlyCount {
    pub year: i32,
    pub month: i32,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScoreTrend {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub avg_score: f64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CounselorWorkload {
    pub counselor_id: Uuid,
    pub counselor_name: String,
    pub appointment_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentAssessment {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub assessment_type: AssessmentType,
    pub total_score: i32,
    pub severity: Severity,
    pub completed_at: DateTime<Utc>,
    pub student_id: Uuid,
    pub student_name: Option<String>,
    pub student_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub level: LogLevel,
    pub category: LogCategory,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub endpoint: Option<String>,
    pub response_time_ms: Option<i32>,
    pub error_code: Option<String>,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_role: Option<UserRole>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_appointments: i64,
    pub pending_appointments: i64,
    pub total_chat_sessions: i64,
    pub active_chat_sessions: i64,
    pub total_assessments: i64,
    pub average_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAnalytics {
    pub session_types: Vec<LabelCount>,
    pub average_duration: f64,
    pub satisfaction_scores: Vec<LabelCount>,
    pub mood_distribution: Vec<LabelCount>,
    pub language_usage: Vec<LabelCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentAnalytics {
    pub assessment_types: Vec<LabelCount>,
    pub severity_distribution: Vec<LabelCount>,
    pub recent_assessments: Vec<RecentAssessment>,
    pub score_trends: Vec<ScoreTrend>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentAnalytics {
    pub status_distribution: Vec<LabelCount>,
    pub monthly_trends: Vec<MonthlyCount>,
    pub counselor_workload: Vec<CounselorWorkload>,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub error_count: i64,
    pub system_load: Vec<LabelCount>,
    pub average_response_time: f64,
    pub active_users: i64,
}
