use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum AppointmentStatus {
        Booked => "booked",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Booked
    }
}

impl AppointmentStatus {
    /// Only a booked appointment can move, and only to completed or cancelled.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Booked, AppointmentStatus::Completed)
                | (AppointmentStatus::Booked, AppointmentStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub counselor_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.student_id == user_id || self.counselor_id == user_id
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    #[serde(default)]
    pub student_id: Option<Uuid>,
    pub counselor_id: Uuid,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
}
