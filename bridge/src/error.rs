use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors from the automation bridge: the process runner, the HTTP server
/// and the HTTP client.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Request body failed validation; the server answers 400.
    #[error("{0}")]
    Validation(String),

    /// Automation output or bridge response was not the JSON we expect.
    #[error("{0}")]
    Protocol(String),

    #[error("automation bridge timed out after {}s", elapsed.as_secs())]
    Timeout { elapsed: Duration },

    /// Bridge answered with a non-success status. `snippet` is the start of the body.
    #[error("bridge returned {status}: {snippet}")]
    Status { status: u16, snippet: String },

    #[error("bridge transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("automation output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },
}

impl BridgeError {
    /// Classify a reqwest failure, keeping timeouts distinct from other
    /// transport errors.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { elapsed: timeout }
        } else {
            Self::Transport(err)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "bridge request failed");
        }
        let body = Json(json!({ "success": false, "message": self.to_string() }));
        (status, body).into_response()
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
