use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

text_enum! {
    pub enum LogLevel {
        Info => "info",
        Warning => "warning",
        Error => "error",
        Critical => "critical",
    }
}

text_enum! {
    pub enum LogCategory {
        Auth => "auth",
        Chat => "chat",
        Assessment => "assessment",
        Appointment => "appointment",
        System => "system",
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogMetadata {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub endpoint: Option<String>,
    pub response_time_ms: Option<i32>,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SystemLog {
    pub id: Uuid,
    pub level: LogLevel,
    pub category: LogCategory,
    pub message: String,
    pub user_id: Option<Uuid>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub endpoint: Option<String>,
    pub response_time_ms: Option<i32>,
    pub error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// An audit entry waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSystemLog {
    pub level: LogLevel,
    pub category: LogCategory,
    pub message: String,
    pub user_id: Option<Uuid>,
    pub metadata: LogMetadata,
}

impl NewSystemLog {
    pub fn new(level: LogLevel, category: LogCategory, message: impl Into<String>) -> Self {
        Self {
            level,
            category,
            message: message.into(),
            user_id: None,
            metadata: LogMetadata::default(),
        }
    }

    pub fn info(category: LogCategory, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, category, message)
    }

    pub fn warning(category: LogCategory, message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, category, message)
    }

    pub fn user(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.metadata.endpoint = Some(endpoint.into());
        self
    }

    pub fn response_time_ms(mut self, millis: i32) -> Self {
        self.metadata.response_time_ms = Some(millis);
        self
    }

    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.metadata.error_code = Some(code.into());
        self
    }

    pub fn client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.metadata.ip = ip;
        self.metadata.user_agent = user_agent;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fills_metadata() {
        let user = Uuid::new_v4();
        let entry = NewSystemLog::warning(LogCategory::System, "slow request")
            .user(Some(user))
            .endpoint("/api/analytics/overview")
            .response_time_ms(1500);

        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.user_id, Some(user));
        assert_eq!(entry.metadata.endpoint.as_deref(), Some("/api/analytics/overview"));
        assert_eq!(entry.metadata.response_time_ms, Some(1500));
        assert!(entry.metadata.error_code.is_none());
    }
}
