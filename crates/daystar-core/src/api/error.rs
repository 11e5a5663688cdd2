use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::auth::StoreError;

/// Failure taxonomy for every gateway call.
///
/// - `Transport`: the request never produced a response (DNS, refused
///   connection, timeout).
/// - `Unauthorized`: 401/403 - the credential is invalid or expired. The
///   gateway clears the credential store before returning this.
/// - `Validation`: 4xx with a structured `{error, details?}` body. The
///   server's message is authoritative and is surfaced verbatim.
/// - `Server`: 5xx, or a 4xx whose body we could not interpret.
/// - `InvalidResponse`: a 2xx whose body did not match the contract.
/// - `Store`: the credential store failed while decorating a request.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{}", message.as_deref().unwrap_or("not signed in, or the session has expired"))]
    Unauthorized {
        /// Server-supplied reason, e.g. "Invalid email or password" on a
        /// failed login. Absent when the body carried no structured error.
        message: Option<String>,
    },

    #[error("{message}")]
    Validation {
        message: String,
        /// Field-keyed validation map from the register endpoint,
        /// e.g. password policy violations.
        details: Option<Value>,
    },

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Structured error body the backend returns on 4xx.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<Value>,
}

impl ApiError {
    /// Truncate a response body to avoid dragging huge payloads into logs.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    /// Classify a non-2xx response into the taxonomy above.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => ApiError::Unauthorized {
                message: serde_json::from_str::<ErrorBody>(body)
                    .ok()
                    .map(|parsed| parsed.error),
            },
            400..=499 => match serde_json::from_str::<ErrorBody>(body) {
                Ok(parsed) => ApiError::Validation {
                    message: parsed.error,
                    details: parsed.details,
                },
                Err(_) => ApiError::Server {
                    status: status.as_u16(),
                    message: Self::truncate_body(body),
                },
            },
            _ => ApiError::Server {
                status: status.as_u16(),
                message: Self::truncate_body(body),
            },
        }
    }

    /// True for the 401/403 class that invalidates the session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Validation detail lines suitable for display under the main message.
    ///
    /// Flattens the register endpoint's field-keyed map; empty for every
    /// other error kind.
    pub fn detail_lines(&self) -> Vec<String> {
        let ApiError::Validation {
            details: Some(details),
            ..
        } = self
        else {
            return Vec::new();
        };

        let mut lines = Vec::new();
        if let Some(map) = details.as_object() {
            for (field, value) in map {
                match value {
                    Value::Array(items) => {
                        for item in items {
                            if let Some(text) = item.as_str() {
                                lines.push(format!("{}: {}", field, text));
                            }
                        }
                    }
                    Value::String(text) => lines.push(format!("{}: {}", field, text)),
                    other => lines.push(format!("{}: {}", field, other)),
                }
            }
        }
        lines
    }
}
