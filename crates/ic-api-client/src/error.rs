//! Error types and HTTP status classification.

use reqwest::StatusCode;
use serde_json::Value;
use shared_types::BackendError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors building the HTTP client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP client construction failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Longest raw body excerpt carried in an error.
const MAX_DETAIL_LEN: usize = 200;

/// Maps a non-success response to a `BackendError`.
pub fn classify(status: StatusCode, body: &str) -> BackendError {
    match status.as_u16() {
        401 | 403 => BackendError::Unauthorized,
        code @ 400..=499 => BackendError::Rejected {
            status: code,
            detail: detail(status, body),
        },
        code => BackendError::Transport(format!("server returned {code}: {}", detail(status, body))),
    }
}

/// Extracts a readable message from an error body.
///
/// FastAPI sends `{"detail": "..."}`, or a list of `{"msg": ...}` objects for
/// validation failures.
fn detail(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        match fields.get("detail") {
            Some(Value::String(text)) => return text.clone(),
            Some(Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if !messages.is_empty() {
                    return messages.join("; ");
                }
            }
            _ => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    trimmed.chars().take(MAX_DETAIL_LEN).collect()
}
