// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration loaded from environment variables.
//!
//! Every value has a static fallback so the client works with an empty
//! environment; only malformed values are rejected.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
/// Default application name.
pub const DEFAULT_APP_NAME: &str = "Vocabulary Trainer";
/// Default public URL of the front-end.
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";
/// Default location of the durable token store.
pub const DEFAULT_TOKEN_STORE_PATH: &str = ".vocab-session.json";

/// Fixed timeout applied to every outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Extra attempts for requests that never reached the server.
pub const RETRY_ATTEMPTS: u32 = 3;
/// Base delay between network retries (multiplied by the attempt number).
pub const RETRY_DELAY: Duration = Duration::from_millis(1000);
/// Background refresh period while authenticated.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Lifetime of the mirrored access-token cookie.
pub const COOKIE_LIFETIME_DAYS: i64 = 7;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend API base URL (no trailing slash)
    pub api_base_url: String,
    /// Display name of the application
    pub app_name: String,
    /// Public URL of the front-end
    pub app_url: String,
    /// Path of the durable token store file
    pub token_store_path: PathBuf,

    /// Timeout for every request
    pub request_timeout: Duration,
    /// Network retry attempts
    pub retry_attempts: u32,
    /// Network retry base delay
    pub retry_delay: Duration,
    /// Background refresh period
    pub refresh_interval: Duration,
    /// Cookie lifetime in days
    pub cookie_lifetime_days: i64,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            token_store_path: PathBuf::from(DEFAULT_TOKEN_STORE_PATH),
            request_timeout: REQUEST_TIMEOUT,
            retry_attempts: RETRY_ATTEMPTS,
            retry_delay: RETRY_DELAY,
            refresh_interval: REFRESH_INTERVAL,
            cookie_lifetime_days: COOKIE_LIFETIME_DAYS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first when present. Unset variables fall back
    /// to the static defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base_url = normalize_base_url(
            &env::var("API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
        )?;

        Ok(Self {
            api_base_url,
            app_name: env::var("APP_NAME").unwrap_or_else(|_| DEFAULT_APP_NAME.to_string()),
            app_url: env::var("APP_URL").unwrap_or_else(|_| DEFAULT_APP_URL.to_string()),
            token_store_path: env::var("TOKEN_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_STORE_PATH)),
            ..Self::default()
        })
    }

    /// Return a copy pointing at another backend.
    pub fn with_api_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url(url)?;
        Ok(self)
    }
}

/// Validate a base URL and strip trailing slashes so paths can be appended.
fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed)
        .map_err(|e| ConfigError::Invalid("API_URL", format!("{trimmed}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(
            "API_URL",
            format!("unsupported scheme {}", url.scheme()),
        ));
    }

    Ok(trimmed.to_string())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
