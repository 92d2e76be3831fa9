use backoff::{future::retry, ExponentialBackoff, ExponentialBackoffBuilder};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;

const SAFETY_CATEGORIES: [&str; 5] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

/// Placeholder reply when the model returns no text part.
pub const EMPTY_REPLY: &str = "...";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(300),
            attempt_timeout: Duration::from_secs(12),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `n` (1-based) is `base_delay * 2^n`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.delay_after(1))
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_interval(Duration::from_secs(60))
            .with_max_elapsed_time(None)
            .build()
    }
}

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Gemini API error ({status}): {body}")]
    Http { status: u16, body: String },
    #[error("Gemini request timed out")]
    Timeout,
    #[error("Gemini connection error: {0}")]
    Transport(String),
    #[error("Failed to parse Gemini response: {0}")]
    Parse(String),
}

impl GeminiError {
    /// Upstream status for HTTP failures, 500 for everything else.
    pub fn status(&self) -> u16 {
        match self {
            GeminiError::Http { status, .. } => *status,
            _ => 500,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "topP")]
    pub top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_p: 0.9,
            max_output_tokens: 128,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

impl GenerateContentRequest {
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
                role: None,
            }],
            generation_config: GenerationConfig::default(),
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: category.to_string(),
                    threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
                })
                .collect(),
        }
    }
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a single-turn prompt and returns the first text part of the reply.
    ///
    /// Transport errors, timeouts, unreadable bodies and 5xx responses are retried up to the
    /// policy's attempt limit; any 4xx is returned immediately.
    pub async fn generate_reply(&self, prompt: &str, model: Option<&str>) -> Result<String, GeminiError> {
        let model = model.filter(|m| !m.is_empty()).unwrap_or(&self.model);
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let request = GenerateContentRequest::from_prompt(prompt);
        let attempts = AtomicU32::new(0);
        let max_attempts = self.retry.max_attempts.max(1);

        tracing::debug!(model = %model, prompt_len = prompt.len(), "Gemini request");

        let operation = || async {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let give_up = attempt >= max_attempts;
            let fail = |err: GeminiError| {
                if give_up {
                    backoff::Error::permanent(err)
                } else {
                    tracing::warn!(attempt, "Gemini call failed (retrying): {}", err);
                    backoff::Error::transient(err)
                }
            };

            let response = self
                .client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .timeout(self.retry.attempt_timeout)
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        fail(GeminiError::Timeout)
                    } else {
                        fail(GeminiError::Transport(e.to_string()))
                    }
                })?;

            let status = response.status();
            if status.is_success() {
                let body: GenerateContentResponse = response
                    .json()
                    .await
                    .map_err(|e| fail(GeminiError::Parse(e.to_string())))?;
                return Ok(body.first_text().unwrap_or(EMPTY_REPLY).to_string());
            }

            let body = response.text().await.unwrap_or_default();
            let err = GeminiError::Http {
                status: status.as_u16(),
                body,
            };
            if status.is_server_error() {
                Err(fail(err))
            } else {
                tracing::error!("Gemini API permanent error: {}", err);
                Err(backoff::Error::permanent(err))
            }
        };

        retry(self.retry.backoff(), operation).await
    }
}

#[cfg(test)]
pub(crate) mod test_stub {
    use axum::{http::StatusCode, response::IntoResponse, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serves the given statuses in order (repeating the last one) and counts hits.
    pub async fn spawn_stub(statuses: Vec<u16>, reply: serde_json::Value) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().fallback(move || {
            let counter = counter.clone();
            let statuses = statuses.clone();
            let reply = reply.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses.get(n).or(statuses.last()).copied().unwrap_or(200);
                if status == 200 {
                    (StatusCode::OK, Json(reply)).into_response()
                } else {
                    (StatusCode::from_u16(status).unwrap(), "UNAVAILABLE").into_response()
                }
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), hits)
    }
}
