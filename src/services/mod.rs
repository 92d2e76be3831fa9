pub mod analytics;
pub mod assessment_store;
pub mod jwt;
pub mod prompt;
pub mod scoring;
pub mod system_log;

pub use analytics::AnalyticsService;
pub use assessment_store::{AssessmentProgress, AssessmentStore};
pub use jwt::JwtKeys;
pub use prompt::PromptSystem;
pub use system_log::SystemLogService;
