use crate::error::{ApiError, ApiResult};
use crate::gemini_client::GeminiError;
use crate::middleware::auth::auth_middleware;
use crate::models::assessment::{Assessment, AssessmentType, Severity, SubmitAssessmentRequest};
use crate::models::auth::Claims;
use crate::models::chat::{AiChatReply, AiChatRequest, ContextRequest, UpstreamErrorBody};
use crate::models::system_log::{LogCategory, LogLevel, NewSystemLog};
use crate::services::prompt::Guidance;
use crate::services::scoring::{
    gad7_severity, phq9_severity, response_items, score_answers, RiskLevel, ScoreBand,
    ANSWER_SCALE, GAD7_QUESTIONS, PHQ9_QUESTIONS,
};
use crate::services::{AssessmentProgress, PromptSystem, SystemLogService};
use crate::extract::Json;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, post, Router},
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub fn ai_routes() -> Router {
    let protected = Router::new()
        .route("/api/ai/assessment", post(submit_assessment))
        .route(
            "/api/ai/assessment/progress",
            get(get_progress).delete(clear_progress),
        )
        .route("/api/ai/context", post(conversation_context))
        .layer(axum::middleware::from_fn(auth_middleware));

    Router::new()
        .route("/api/ai/chat", post(chat))
        .route("/api/ai/assessment/questions", get(assessment_questions))
        .merge(protected)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentOutcome {
    pub success: bool,
    pub assessment: Assessment,
    pub phq9: Option<ScoreBand>,
    pub gad7: Option<ScoreBand>,
    pub overall_risk: RiskLevel,
    pub response: Guidance,
    pub suggestions: Vec<String>,
}

async fn chat(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<AiChatRequest>,
) -> ApiResult<Json<AiChatReply>> {
    let client = state
        .gemini_client
        .as_ref()
        .ok_or_else(|| ApiError::Upstream("Missing GEMINI_API_KEY".to_string()))?;

    let last_user_message = payload
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str());
    if last_user_message.is_some_and(PromptSystem::detect_crisis_keywords) {
        tracing::warn!("crisis keywords detected in AI chat");
        SystemLogService::record_detached(
            &state.db_pool,
            NewSystemLog::new(
                LogLevel::Critical,
                LogCategory::Chat,
                "Crisis keywords detected in AI chat",
            )
            .endpoint("POST /api/ai/chat"),
        );
    }

    let prompt = state.prompts.proxy_prompt(&payload.messages, &payload.lang);

    match client.generate_reply(&prompt, payload.model.as_deref()).await {
        Ok(reply) => Ok(Json(AiChatReply {
            reply,
            degraded: None,
            error: None,
        })),
        Err(e) => {
            tracing::warn!("AI chat degraded to fallback reply: {}", e);
            SystemLogService::record_detached(
                &state.db_pool,
                NewSystemLog::warning(LogCategory::Chat, "AI reply degraded to fallback")
                    .endpoint("POST /api/ai/chat")
                    .error_code(e.status().to_string()),
            );

            let text = match &e {
                GeminiError::Http { body, .. } => body.clone(),
                other => other.to_string(),
            };
            Ok(Json(AiChatReply {
                reply: PromptSystem::fallback_message(&payload.lang).to_string(),
                degraded: Some(true),
                error: Some(UpstreamErrorBody {
                    status: e.status(),
                    text,
                }),
            }))
        }
    }
}

async fn assessment_questions() -> Json<Value> {
    Json(json!({
        "phq9": PHQ9_QUESTIONS,
        "gad7": GAD7_QUESTIONS,
        "scale": ANSWER_SCALE,
    }))
}

/// Scores one questionnaire if it was answered.
fn score(
    name: &'static str,
    bank: &[&str],
    answers: Option<&[u8]>,
    band: fn(u32) -> ScoreBand,
) -> ApiResult<Option<ScoreBand>> {
    answers
        .map(|answers| {
            score_answers(name, bank, answers)
                .map(band)
                .map_err(|e| ApiError::Validation(e.to_string()))
        })
        .transpose()
}

async fn submit_assessment(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitAssessmentRequest>,
) -> ApiResult<(StatusCode, Json<AssessmentOutcome>)> {
    let student_id = super::caller_id(&claims)?;

    let phq9 = score("PHQ-9", &PHQ9_QUESTIONS, payload.phq9.as_deref(), phq9_severity)?;
    let gad7 = score("GAD-7", &GAD7_QUESTIONS, payload.gad7.as_deref(), gad7_severity)?;

    let assessment_type = match (&phq9, &gad7) {
        (Some(_), Some(_)) => AssessmentType::Combined,
        (Some(_), None) => AssessmentType::Phq9,
        (None, Some(_)) => AssessmentType::Gad7,
        (None, None) => {
            return Err(ApiError::Validation(
                "Provide PHQ-9 and/or GAD-7 answers".to_string(),
            ))
        }
    };

    // Combined results report the summed score and the worse of the two severities
    let bands = [phq9, gad7];
    let total_score: u32 = bands.iter().flatten().map(|b| b.score).sum();
    let severity = bands
        .iter()
        .flatten()
        .map(|b| b.level.unwrap_or(Severity::Moderate))
        .max()
        .unwrap_or(Severity::Minimal);

    let mut responses = Vec::new();
    if let Some(answers) = &payload.phq9 {
        responses.extend(response_items("phq9", &PHQ9_QUESTIONS, answers));
    }
    if let Some(answers) = &payload.gad7 {
        responses.extend(response_items("gad7", &GAD7_QUESTIONS, answers));
    }

    let progress = AssessmentProgress::new(phq9, gad7);
    let overall_risk = progress.overall_risk;
    let suggestions = state.prompts.self_help_suggestions(overall_risk);

    let assessment = sqlx::query_as::<_, Assessment>(
        r#"
        INSERT INTO assessments (id, student_id, type, responses, total_score, severity, recommendations, completed_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(assessment_type)
    .bind(sqlx::types::Json(&responses))
    .bind(total_score as i32)
    .bind(severity)
    .bind(&suggestions)
    .fetch_one(&state.db_pool)
    .await?;

    state
        .assessment_store
        .record(&student_id.to_string(), progress);

    tracing::info!(
        assessment_id = %assessment.id,
        assessment_type = %assessment_type,
        total_score,
        overall_risk = overall_risk.as_str(),
        "assessment submitted"
    );
    let level = if overall_risk == RiskLevel::High {
        LogLevel::Critical
    } else {
        LogLevel::Info
    };
    SystemLogService::record_detached(
        &state.db_pool,
        NewSystemLog::new(
            level,
            LogCategory::Assessment,
            format!("{} assessment completed ({} risk)", assessment_type, overall_risk.as_str()),
        )
        .user(Some(student_id))
        .endpoint("POST /api/ai/assessment"),
    );

    Ok((
        StatusCode::CREATED,
        Json(AssessmentOutcome {
            success: true,
            assessment,
            phq9,
            gad7,
            overall_risk,
            response: state.prompts.risk_response(overall_risk),
            suggestions,
        }),
    ))
}

async fn get_progress(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Option<AssessmentProgress>>> {
    let user_id = super::caller_id(&claims)?;
    Ok(Json(state.assessment_store.get(&user_id.to_string())))
}

async fn clear_progress(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<StatusCode> {
    let user_id = super::caller_id(&claims)?;
    state.assessment_store.clear(&user_id.to_string());
    Ok(StatusCode::NO_CONTENT)
}

async fn conversation_context(
    Extension(state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ContextRequest>,
) -> ApiResult<Json<Guidance>> {
    let user_id = super::caller_id(&claims)?;
    let progress = state.assessment_store.get(&user_id.to_string());
    let guidance = state
        .prompts
        .conversation_context(progress.as_ref(), &payload.messages);

    if guidance.immediate_action {
        tracing::warn!(user_id = %user_id, "crisis response triggered");
        SystemLogService::record_detached(
            &state.db_pool,
            NewSystemLog::new(
                LogLevel::Critical,
                LogCategory::Chat,
                "Crisis keywords detected in conversation",
            )
            .user(Some(user_id))
            .endpoint("POST /api/ai/context"),
        );
    }

    Ok(Json(guidance))
}
