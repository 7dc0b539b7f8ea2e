// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend API client with bearer attachment and transparent token refresh.
//!
//! Handles:
//! - Attaching the stored access token to every authenticated request
//! - A single replay after 401, behind one shared refresh exchange
//! - Error normalization into [`ClientError`]
//! - Linear-backoff retry of requests that never reached the server

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::models::{ApiResponse, TokenPair};
use crate::routes::{Navigator, LOGIN};
use crate::services::refresh::{RefreshCoordinator, Ticket};
use crate::storage::{Credential, TokenStore};

/// Refresh exchange endpoint, relative to the API base.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Transport-level retry: network failures only, linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// File sent as the multipart `file` part.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    // Forms are consumed by send, so one is built per attempt
    fn to_form(&self) -> Result<reqwest::multipart::Form> {
        let mut part =
            reqwest::multipart::Part::bytes(self.bytes.clone()).file_name(self.file_name.clone());
        if let Some(mime) = &self.mime {
            part = part
                .mime_str(mime)
                .map_err(|e| ClientError::Config(format!("invalid MIME type {mime}: {e}")))?;
        }
        Ok(reqwest::multipart::Form::new().part("file", part))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    Bearer,
    Anonymous,
}

#[derive(Debug)]
enum Body {
    Empty,
    Json(Value),
    Multipart(FileUpload),
}

#[derive(Debug)]
struct Outgoing {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Body,
    auth: Auth,
}

impl Outgoing {
    fn new(method: Method, path: &str, auth: Auth) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            body: Body::Empty,
            auth,
        }
    }

    fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::Decode(format!("request body: {e}")))?;
        self.body = Body::Json(value);
        Ok(self)
    }
}

/// Backend API client.
///
/// Constructed explicitly and shared behind an `Arc`; all refreshes for one
/// client go through a single [`RefreshCoordinator`].
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    navigator: Arc<dyn Navigator>,
    refresh: RefreshCoordinator,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(
        config: &Config,
        tokens: Arc<TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens,
            navigator,
            refresh: RefreshCoordinator::new(),
            retry: RetryPolicy {
                attempts: config.retry_attempts,
                base_delay: config.retry_delay,
            },
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// True while a refresh exchange is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    // ─────────────────────────────────────────────────────────────
    // Authenticated verbs
    // ─────────────────────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        self.execute(Outgoing::new(Method::GET, path, Auth::Bearer))
            .await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse<T>> {
        let mut req = Outgoing::new(Method::GET, path, Auth::Bearer);
        req.query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.execute(req).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        self.execute(Outgoing::new(Method::POST, path, Auth::Bearer).json(body)?)
            .await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        self.execute(Outgoing::new(Method::POST, path, Auth::Bearer))
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        self.execute(Outgoing::new(Method::PUT, path, Auth::Bearer).json(body)?)
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        self.execute(Outgoing::new(Method::PATCH, path, Auth::Bearer).json(body)?)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        self.execute(Outgoing::new(Method::DELETE, path, Auth::Bearer))
            .await
    }

    /// POST `file` as multipart form data.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file: FileUpload,
    ) -> Result<ApiResponse<T>> {
        let mut req = Outgoing::new(Method::POST, path, Auth::Bearer);
        req.body = Body::Multipart(file);
        self.execute(req).await
    }

    // ─────────────────────────────────────────────────────────────
    // Pre-auth verbs: no bearer, 401 surfaced as-is
    // ─────────────────────────────────────────────────────────────

    pub async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        self.execute(Outgoing::new(Method::GET, path, Auth::Anonymous))
            .await
    }

    pub async fn post_public<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>> {
        self.execute(Outgoing::new(Method::POST, path, Auth::Anonymous).json(body)?)
            .await
    }

    // ─────────────────────────────────────────────────────────────
    // Refresh
    // ─────────────────────────────────────────────────────────────

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Callers arriving while an exchange is running wait for its outcome
    /// instead of starting another one. On failure local tokens are cleared
    /// and the navigator is sent to the login page, unless a logout already
    /// ended the session, in which case the result is
    /// [`ClientError::SessionEnded`].
    pub async fn refresh_tokens(&self) -> Result<TokenPair> {
        match self.refresh.join() {
            Ticket::Follower(follower) => {
                tracing::debug!("Refresh already in flight, waiting for it");
                follower.wait().await
            }
            Ticket::Leader(leader) => {
                let outcome = self.exchange_refresh_token().await;
                leader.settle(outcome)
            }
        }
    }

    async fn exchange_refresh_token(&self) -> Result<TokenPair> {
        let generation = self.tokens.generation();
        tracing::info!("Refreshing access token");

        match self.request_refresh().await {
            Ok(pair) => {
                if self.tokens.set_tokens_if_generation(
                    generation,
                    &pair.access_token,
                    pair.refresh_token.as_deref(),
                ) {
                    tracing::info!("Access token refreshed");
                    Ok(pair)
                } else {
                    tracing::info!("Session ended during refresh, discarding new tokens");
                    Err(ClientError::SessionEnded)
                }
            }
            Err(_) if self.tokens.generation() != generation => {
                tracing::info!("Session ended during failed refresh");
                Err(ClientError::SessionEnded)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, signing out");
                self.tokens.clear_tokens();
                self.navigator.navigate(LOGIN);
                Err(e)
            }
        }
    }

    async fn request_refresh(&self) -> Result<TokenPair> {
        let refresh_token = self
            .tokens
            .get_refresh_token()
            .ok_or(ClientError::NoRefreshToken)?;

        let body = serde_json::json!({ "refresh_token": refresh_token });
        let req = Outgoing::new(Method::POST, REFRESH_PATH, Auth::Anonymous).json(&body)?;

        // Sent directly, never through the 401 handling in `execute`
        let response = self.send_with_retry(&req, None).await?;
        decode::<TokenPair>(response).await?.into_data()
    }

    // ─────────────────────────────────────────────────────────────
    // Request pipeline
    // ─────────────────────────────────────────────────────────────

    /// One logical request: send, and on 401 replay once with a fresh token.
    async fn execute<T: DeserializeOwned>(&self, req: Outgoing) -> Result<ApiResponse<T>> {
        let credential = match req.auth {
            Auth::Bearer => self.tokens.credential(),
            Auth::Anonymous => None,
        };
        let sent_token = credential.as_ref().map(|c| c.token.clone());

        let response = self
            .send_with_retry(&req, credential.map(|c| c.header))
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED || req.auth == Auth::Anonymous {
            return decode(response).await;
        }

        // The replay below is the retry; its 401 is final
        let header = match self.tokens.credential() {
            Some(current) if Some(&current.token) != sent_token.as_ref() => {
                tracing::debug!(path = %req.path, "Token changed in flight, replaying");
                current.header
            }
            _ => {
                let pair = self.refresh_tokens().await?;
                Credential::bearer(&pair.access_token)
                    .map(|c| c.header)
                    .ok_or_else(|| {
                        ClientError::Decode("refreshed token is not a valid header".to_string())
                    })?
            }
        };

        let response = self.send_with_retry(&req, Some(header)).await?;
        decode(response).await
    }

    /// Send, retrying only when no response was received.
    async fn send_with_retry(
        &self,
        req: &Outgoing,
        authorization: Option<HeaderValue>,
    ) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            match self.send(req, authorization.clone()).await {
                Err(e) if e.is_network() && attempt < self.retry.attempts => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        method = %req.method,
                        path = %req.path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Network error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn send(
        &self,
        req: &Outgoing,
        authorization: Option<HeaderValue>,
    ) -> Result<reqwest::Response> {
        let mut builder = self.http.request(req.method.clone(), self.url(&req.path));

        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(header) = authorization {
            builder = builder.header(AUTHORIZATION, header);
        }
        builder = match &req.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(file) => builder.multipart(file.to_form()?),
        };

        builder.send().await.map_err(|e| {
            if e.is_builder() {
                ClientError::Config(e.to_string())
            } else {
                tracing::debug!(error = %e, path = %req.path, "Request did not reach the server");
                ClientError::Network(e.to_string())
            }
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Map a response to the envelope, normalizing non-2xx statuses.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<ApiResponse<T>> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?;

    if !status.is_success() {
        let body = serde_json::from_slice::<Value>(&bytes).ok();
        return Err(ClientError::from_status(status.as_u16(), body));
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ApiResponse::empty());
    }

    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}
