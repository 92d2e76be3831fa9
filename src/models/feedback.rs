use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub student_id: Uuid,
    pub counselor_id: Uuid,
    pub appointment_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    #[serde(default)]
    pub student_id: Option<Uuid>,
    pub counselor_id: Uuid,
    pub appointment_id: Uuid,
    pub rating: i16,
    #[serde(default)]
    pub comment: Option<String>,
}

impl SubmitFeedbackRequest {
    pub fn rating_is_valid(&self) -> bool {
        (MIN_RATING..=MAX_RATING).contains(&self.rating)
    }
}
