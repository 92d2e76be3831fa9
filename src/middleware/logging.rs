use crate::models::system_log::{LogCategory, LogLevel, NewSystemLog};
use crate::services::SystemLogService;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, MatchedPath, Request},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Requests slower than this are written to the system log.
pub const SLOW_REQUEST_MS: u128 = 1000;

/// Which requests end up in `system_logs`: server errors and slow requests.
pub fn audit_level(status: StatusCode, elapsed_ms: u128) -> Option<LogLevel> {
    if status.is_server_error() {
        Some(LogLevel::Error)
    } else if elapsed_ms >= SLOW_REQUEST_MS {
        Some(LogLevel::Warning)
    } else {
        None
    }
}

/// Request logging middleware that adds structured logging for all HTTP requests
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().clone();
    let matched_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_owned())
        .unwrap_or_else(|| uri.path().to_owned());
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());
    let state = req.extensions().get::<Arc<AppState>>().cloned();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %matched_path,
        uri = %uri,
        user_agent = user_agent.as_deref().unwrap_or("unknown"),
        remote_addr = remote_addr.as_deref().unwrap_or("unknown"),
        "incoming request"
    );

    let mut response = next.run(req).await;

    let elapsed_ms = start.elapsed().as_millis();
    let status = response.status();

    match status.as_u16() {
        400..=499 => tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            status = status.as_u16(),
            duration_ms = elapsed_ms as u64,
            "request completed (client error)"
        ),
        500..=599 => tracing::error!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            status = status.as_u16(),
            duration_ms = elapsed_ms as u64,
            "request completed (server error)"
        ),
        _ => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            status = status.as_u16(),
            duration_ms = elapsed_ms as u64,
            "request completed"
        ),
    }

    if let (Some(level), Some(state)) = (audit_level(status, elapsed_ms), state) {
        let message = if status.is_server_error() {
            format!("{} {} failed with {}", method, matched_path, status.as_u16())
        } else {
            format!("Slow request: {} {} took {}ms", method, matched_path, elapsed_ms)
        };
        let mut entry = NewSystemLog::new(level, LogCategory::System, message)
            .endpoint(format!("{} {}", method, matched_path))
            .response_time_ms(i32::try_from(elapsed_ms).unwrap_or(i32::MAX))
            .client(remote_addr, user_agent);
        if status.is_server_error() {
            entry = entry.error_code(status.as_u16().to_string());
        }
        SystemLogService::record_detached(&state.db_pool, entry);
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_level() {
        assert_eq!(audit_level(StatusCode::OK, 10), None);
        assert_eq!(audit_level(StatusCode::NOT_FOUND, 10), None);
        assert_eq!(audit_level(StatusCode::OK, 1000), Some(LogLevel::Warning));
        assert_eq!(
            audit_level(StatusCode::INTERNAL_SERVER_ERROR, 5),
            Some(LogLevel::Error)
        );
        assert_eq!(
            audit_level(StatusCode::BAD_GATEWAY, 5000),
            Some(LogLevel::Error)
        );
    }
}
