// lib.rs - HopeLine API: router, shared state, and the modules behind them
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod gemini_client;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Extension, Router,
};
use config::Config;
use gemini_client::GeminiClient;
use services::{AssessmentStore, JwtKeys, PromptSystem};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Shared application state, handed to handlers through `Extension<Arc<AppState>>`.
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub jwt: JwtKeys,
    pub gemini_client: Option<GeminiClient>,
    pub prompts: PromptSystem,
    pub assessment_store: AssessmentStore,
}

impl AppState {
    pub fn new(config: Config, db_pool: PgPool) -> Self {
        let jwt = JwtKeys::new(
            &config.jwt_secret,
            config.jwt_refresh_secret.as_deref(),
            config.jwt_expires_in,
        );

        let gemini_client = match &config.gemini_api_key {
            Some(api_key) => {
                tracing::info!("Initializing Gemini client ({})...", config.gemini_model);
                Some(GeminiClient::new(
                    api_key.clone(),
                    config.gemini_base_url.clone(),
                    config.gemini_model.clone(),
                ))
            }
            None => {
                tracing::warn!("GEMINI_API_KEY not found. /api/ai/chat will return 500.");
                None
            }
        };

        Self {
            prompts: PromptSystem::new(config.counselor_contact.clone()),
            assessment_store: AssessmentStore::new(
                config.assessment_ttl,
                config.assessment_store_capacity,
            ),
            db_pool,
            jwt,
            gemini_client,
            config,
        }
    }
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

/// Builds the application with all routes and shared state
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(handlers::status::status_routes())
        .merge(handlers::auth::auth_routes())
        .merge(handlers::appointments::appointment_routes())
        .merge(handlers::feedback::feedback_routes())
        .merge(handlers::ai::ai_routes())
        .merge(handlers::chat_sessions::chat_session_routes())
        .merge(handlers::analytics::analytics_routes())
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(cors)
        .layer(Extension(state))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use crate::models::auth::{Claims, TokenType, UserRole};
    use crate::services::scoring::{gad7_severity, phq9_severity};
    use crate::services::AssessmentProgress;
    use axum::http::StatusCode;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    #[tokio::test]
    async fn test_root_reports_ok() {
        let response = send(test_state(), "GET", "/", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = json_body(response).await;
        assert_eq!(body, json!({ "status": "ok", "service": "HopeLine API" }));
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let response = send(test_state(), "GET", "/api/appointments", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Missing Authorization header");
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            role: UserRole::Admin,
            email: String::new(),
            name: String::new(),
            token_type: TokenType::Access,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let response = send(test_state(), "GET", "/api/feedback", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_a_bearer_token() {
        let state = test_state();
        let (_, token) = token_for(&state, UserRole::Student, TokenType::Refresh);
        let response = send(state, "GET", "/api/chat/sessions", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_students_cannot_see_analytics() {
        let state = test_state();
        let (_, token) = token_for(&state, UserRole::Student, TokenType::Access);
        for path in [
            "/api/analytics/overview",
            "/api/analytics/system/health",
            "/api/analytics/activity/feed?limit=5",
        ] {
            let response = send(state.clone(), "GET", path, Some(&token), None).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", path);
        }
    }

    #[tokio::test]
    async fn test_register_validates_before_touching_db() {
        let state = test_state();
        let short = json!({
            "name": "Asha", "email": "asha@university.edu", "username": "asha", "password": "123"
        });
        let response = send(state.clone(), "POST", "/api/auth/register", None, Some(short)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let admin = json!({
            "name": "Eve", "email": "eve@university.edu", "username": "eve",
            "password": "secret123", "role": "admin"
        });
        let response = send(state, "POST", "/api/auth/register", None, Some(admin)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_register_cannot_claim_staff_role() {
        let state = test_state();
        for role in ["counselor", "admin"] {
            let body = json!({
                "name": "Mallory", "email": "mallory@university.edu", "username": "mallory",
                "password": "secret123", "role": role
            });
            let response = send(state.clone(), "POST", "/api/auth/register", None, Some(body)).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", role);
            let body = json_body(response).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Only student accounts can be self-registered");
        }
    }

    #[tokio::test]
    async fn test_malformed_bodies_get_json_400() {
        let state = test_state();
        let (_, token) = token_for(&state, UserRole::Student, TokenType::Access);

        let feedback = json!({
            "counselorId": uuid::Uuid::new_v4(),
            "appointmentId": uuid::Uuid::new_v4(),
            "rating": 70000
        });
        let response = send(state.clone(), "POST", "/api/feedback/submit", Some(&token), Some(feedback)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("rating"));

        let booking = json!({ "counselorId": uuid::Uuid::new_v4() });
        let response = send(state.clone(), "POST", "/api/appointments/book", Some(&token), Some(booking)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("startsAt"));

        let status = json!({ "status": "postponed" });
        let response = send(state.clone(), "PATCH", "/api/appointments/not-a-uuid/status", Some(&token), Some(status)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_login_requires_password_and_identifier() {
        let state = test_state();
        let response = send(
            state.clone(),
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "student@university.edu" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Password is required");

        let response = send(
            state,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "password": "admin123" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_feedback_rating_out_of_range() {
        let state = test_state();
        let (_, token) = token_for(&state, UserRole::Student, TokenType::Access);
        let body = json!({
            "counselorId": uuid::Uuid::new_v4(),
            "appointmentId": uuid::Uuid::new_v4(),
            "rating": 6
        });
        let response = send(state, "POST", "/api/feedback/submit", Some(&token), Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "Rating must be between 1 and 5");
    }

    #[tokio::test]
    async fn test_ai_chat_without_api_key() {
        let response = send(
            test_state(),
            "POST",
            "/api/ai/chat",
            None,
            Some(json!({ "messages": [{ "role": "user", "content": "hello" }] })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["message"], "Missing GEMINI_API_KEY");
    }

    #[tokio::test]
    async fn test_assessment_questions() {
        let response = send(test_state(), "GET", "/api/ai/assessment/questions", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["phq9"].as_array().unwrap().len(), 9);
        assert_eq!(body["gad7"].as_array().unwrap().len(), 7);
        assert_eq!(body["scale"][3], "Nearly every day");
    }

    #[tokio::test]
    async fn test_assessment_rejects_bad_answers() {
        let state = test_state();
        let (_, token) = token_for(&state, UserRole::Student, TokenType::Access);

        let response = send(
            state.clone(),
            "POST",
            "/api/ai/assessment",
            Some(&token),
            Some(json!({ "phq9": [1, 2, 3] })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            state.clone(),
            "POST",
            "/api/ai/assessment",
            Some(&token),
            Some(json!({ "gad7": [0, 0, 0, 4, 0, 0, 0] })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(state, "POST", "/api/ai/assessment", Some(&token), Some(json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_progress_lifecycle() {
        let state = test_state();
        let (user_id, token) = token_for(&state, UserRole::Student, TokenType::Access);

        let response = send(state.clone(), "GET", "/api/ai/assessment/progress", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await.is_null());

        state.assessment_store.record(
            &user_id.to_string(),
            AssessmentProgress::new(Some(phq9_severity(16)), Some(gad7_severity(4))),
        );
        let response = send(state.clone(), "GET", "/api/ai/assessment/progress", Some(&token), None).await;
        let body = json_body(response).await;
        assert_eq!(body["overallRisk"], "high");
        assert_eq!(body["phq9"]["score"], 16);

        let response = send(state.clone(), "POST", "/api/ai/context", Some(&token), Some(json!({
            "messages": [{ "role": "user", "content": "I'm tired" }]
        })))
        .await;
        assert_eq!(json_body(response).await["action"], "crisis_intervention");

        let response = send(state.clone(), "DELETE", "/api/ai/assessment/progress", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.assessment_store.is_empty());
    }

    #[tokio::test]
    async fn test_context_flags_crisis_without_progress() {
        let state = test_state();
        let (_, token) = token_for(&state, UserRole::Student, TokenType::Access);
        let response = send(state, "POST", "/api/ai/context", Some(&token), Some(json!({
            "messages": [{ "role": "user", "content": "I want to end my life" }]
        })))
        .await;
        let body = json_body(response).await;
        assert_eq!(body["action"], "crisis_intervention");
        assert_eq!(body["immediateAction"], true);
        assert_eq!(body["counselorContact"], "+91-9999-888-777");
    }

    #[tokio::test]
    async fn test_end_session_rejects_active_status() {
        let state = test_state();
        let (_, token) = token_for(&state, UserRole::Student, TokenType::Access);
        let uri = format!("/api/chat/sessions/{}/end", uuid::Uuid::new_v4());
        let response = send(state, "POST", &uri, Some(&token), Some(json!({ "status": "active" }))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
