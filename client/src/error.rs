// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong while talking to the task API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure: DNS, refused connection, reset, aborted body.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request timed out after {}s", .duration.as_secs())]
    Timeout { duration: Duration },

    /// The body was not valid JSON or not shaped like the expected type.
    #[error("could not decode response: {message}")]
    Decode { message: String },

    #[error("task {id} not found")]
    NotFound { id: i64 },

    /// The server rejected the submitted payload.
    #[error("rejected by server (status {status}): {message}")]
    Validation { status: u16, message: String },

    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// The kind of a [`ClientError`], without its payload.
///
/// The view keeps this next to the user-facing message so the cause of a
/// failure survives even though the message itself stays generic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Timeout,
    Decode,
    NotFound,
    Validation,
    Server,
    Config,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::Timeout { .. } => ErrorKind::Timeout,
            ClientError::Decode { .. } => ErrorKind::Decode,
            ClientError::NotFound { .. } => ErrorKind::NotFound,
            ClientError::Validation { .. } => ErrorKind::Validation,
            ClientError::Server { .. } => ErrorKind::Server,
            ClientError::InvalidUrl(_) | ClientError::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether repeating the same call could succeed. Informational only: the
    /// client never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Timeout { .. } => true,
            ClientError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Classifies a transport error, pulling timeouts out as their own kind.
    pub(crate) fn from_transport(err: reqwest::Error, timeouts: Timeouts) -> Self {
        if err.is_timeout() {
            ClientError::Timeout {
                duration: timeouts.limit(err.is_connect()),
            }
        } else {
            ClientError::Network(err)
        }
    }

    pub(crate) fn decode(err: serde_json::Error) -> Self {
        ClientError::Decode {
            message: err.to_string(),
        }
    }

    /// Maps a non-success status to an error. `id` is the task the call
    /// addressed, if it addressed one; a 404 only means "not found" then.
    pub(crate) fn from_status(status: StatusCode, id: Option<i64>, body: &str) -> Self {
        let message = error_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
        match (status, id) {
            (StatusCode::NOT_FOUND, Some(id)) => ClientError::NotFound { id },
            (
                StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY,
                _,
            ) => ClientError::Validation {
                status: status.as_u16(),
                message,
            },
            _ => ClientError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// The two limits a request runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timeouts {
    pub request: Duration,
    pub connect: Duration,
}

impl Timeouts {
    /// The limit that expired: the connect limit if the connection was never
    /// established, the whole-request limit otherwise.
    pub(crate) fn limit(&self, connecting: bool) -> Duration {
        if connecting { self.connect } else { self.request }
    }
}

/// Extracts a human message from an error body. Servers answer with either
/// `{"message": ...}` or `{"error": ...}`; anything else is used as plain text.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
    }
    Some(trimmed.to_string())
}

pub type Result<T> = std::result::Result<T, ClientError>;
