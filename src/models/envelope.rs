//! Normalized response envelope used by every backend endpoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// `{ success, data?, message?, error?, errors? }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error: Option<String>,
    /// Field name → validation messages.
    pub errors: Option<HashMap<String, Vec<String>>>,
}

// A 2xx body that omits `success` is treated as successful.
fn default_success() -> bool {
    true
}

impl<T> ApiResponse<T> {
    /// Envelope for endpoints that answer 2xx with an empty body.
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            message: None,
            error: None,
            errors: None,
        }
    }

    /// Unwrap the payload, treating `success: false` as a rejection.
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(ClientError::Rejected(self.rejection_message()));
        }
        self.data.ok_or(ClientError::MissingData)
    }

    /// Check only the `success` flag, ignoring the payload.
    pub fn into_unit(self) -> Result<()> {
        if !self.success {
            return Err(ClientError::Rejected(self.rejection_message()));
        }
        Ok(())
    }

    fn rejection_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "Request was not successful".to_string())
    }
}
