// [[AGENTDECK]]/apps/console-server/src/error.rs
// Purpose: Error taxonomy for backend access, configuration and the HTTP surface.
// Architecture: Cross-cutting
// Dependencies: thiserror, reqwest, axum

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("Backend request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Backend returned {status} for {endpoint}")]
    Upstream { endpoint: String, status: u16 },
    #[error("Could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl ConsoleError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConsoleError::Transport { .. }
            | ConsoleError::Upstream { .. }
            | ConsoleError::Decode { .. } => StatusCode::BAD_GATEWAY,
            ConsoleError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
