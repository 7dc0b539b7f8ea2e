// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types with normalized, human-readable messages.

use serde_json::Value;

/// Message used for requests that never reached the server.
pub const NETWORK_ERROR_MESSAGE: &str =
    "Network error. Please check your connection and try again.";

/// Errors surfaced by the HTTP client, auth service and session container.
///
/// `Clone` so a single refresh failure can be handed to every queued request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// No response object: DNS, connect, timeout, connection reset.
    #[error("{}", NETWORK_ERROR_MESSAGE)]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    #[error("No access token available")]
    NoToken,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token refresh was interrupted")]
    RefreshAborted,

    #[error("Session ended while the token was being refreshed")]
    SessionEnded,

    /// 2xx response whose envelope carried `success: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("Response did not contain any data")]
    MissingData,

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Build a normalized HTTP error from a status and the decoded body.
    ///
    /// Message priority: `message`, `detail`, `error`, then a static
    /// per-status default.
    pub fn from_status(status: u16, body: Option<Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(server_message)
            .unwrap_or_else(|| default_status_message(status));

        ClientError::Http {
            status,
            message,
            body,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for failures where no response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }

    /// True for 401 responses.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ClientError::Validation(errors.to_string())
    }
}

/// First non-empty string among the server-supplied message fields.
fn server_message(body: &Value) -> Option<String> {
    ["message", "detail", "error"].iter().find_map(|field| {
        body.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    })
}

/// Static fallback message for a status code.
pub fn default_status_message(status: u16) -> String {
    match status {
        401 => "Unauthorized. Please login again.".to_string(),
        403 => "Forbidden. You do not have permission to access this resource.".to_string(),
        404 => "Resource not found.".to_string(),
        422 => "Validation error. Please check your input.".to_string(),
        500 => "Internal server error. Please try again later.".to_string(),
        other => format!("Request failed with status {other}"),
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
