use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum SessionType {
        Ai => "ai",
        Peer => "peer",
        Counselor => "counselor",
    }
}

text_enum! {
    pub enum Sender {
        Student => "student",
        Ai => "ai",
        Peer => "peer",
        Counselor => "counselor",
    }
}

text_enum! {
    pub enum SessionStatus {
        Active => "active",
        Completed => "completed",
        Abandoned => "abandoned",
    }
}

text_enum! {
    pub enum Mood {
        Down => "down",
        Content => "content",
        Peaceful => "peaceful",
        Happy => "happy",
        Excited => "excited",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: Uuid,
    pub student_id: Uuid,
    pub session_type: SessionType,
    pub duration: i32, // minutes
    pub satisfaction: Option<i16>,
    pub status: SessionStatus,
    pub mood: Option<Mood>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sender: Sender,
    pub content: String,
    pub language: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub session_type: SessionType,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub sender: Sender,
    pub content: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EndSessionRequest {
    pub status: SessionStatus,
    #[serde(default)]
    pub satisfaction: Option<i16>,
    #[serde(default)]
    pub mood: Option<Mood>,
    #[serde(default)]
    pub duration: Option<i32>,
}

/// One turn of the conversation forwarded to the AI proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct AiChatRequest {
    #[serde(default)]
    pub messages: Vec<AiChatMessage>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_lang() -> String {
    "en".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpstreamErrorBody {
    pub status: u16,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AiChatReply {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<UpstreamErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct ContextRequest {
    #[serde(default)]
    pub messages: Vec<AiChatMessage>,
}
