use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum AssessmentType {
        Phq9 => "PHQ-9",
        Gad7 => "GAD-7",
        Combined => "combined",
    }
}

text_enum! {
    /// Ordered from least to most severe.
    pub enum Severity {
        Minimal => "minimal",
        Mild => "mild",
        Moderate => "moderate",
        ModeratelySevere => "moderately_severe",
        Severe => "severe",
    }
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Minimal => "minimal",
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::ModeratelySevere => "moderately severe",
            Severity::Severe => "severe",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponseItem {
    pub question_id: String,
    pub question: String,
    pub answer: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: Uuid,
    pub student_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub assessment_type: AssessmentType,
    pub responses: Json<Vec<AssessmentResponseItem>>,
    pub total_score: i32,
    pub severity: Severity,
    pub recommendations: Vec<String>,
    pub completed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Raw answers, one entry per questionnaire item in bank order.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitAssessmentRequest {
    #[serde(default)]
    pub phq9: Option<Vec<u8>>,
    #[serde(default)]
    pub gad7: Option<Vec<u8>>,
}
