// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use vocab_session::config::Config;
use vocab_session::routes::RecordingNavigator;
use vocab_session::storage::{KeyValueStorage, MemoryStorage};
use vocab_session::AuthContext;

/// Password the mock backend accepts.
#[allow(dead_code)]
pub const PASSWORD: &str = "secret123";

/// Shared state of the mock backend.
#[derive(Default)]
pub struct MockState {
    valid_access: Mutex<Option<String>>,
    valid_refresh: Mutex<Option<String>>,
    issued: AtomicUsize,

    pub login_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub words_calls: AtomicUsize,
    pub error_calls: AtomicUsize,

    /// Authorization headers seen by `/words`, in order.
    pub words_auth: Mutex<Vec<Option<String>>>,

    pub refresh_delay_ms: AtomicUsize,
    pub fail_refresh: AtomicBool,
    pub fail_logout: AtomicBool,
    pub register_returns_tokens: AtomicBool,
    /// Login responses carry no refresh token.
    pub login_omits_refresh: AtomicBool,
    /// `/users/me` answers 500 even for a valid token.
    pub fail_me: AtomicBool,
    pub words_always_unauthorized: AtomicBool,
    pub admin: AtomicBool,
}

#[allow(dead_code)]
impl MockState {
    /// Mint a fresh pair and make it the only valid one.
    fn issue(&self) -> (String, String) {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("access-{n}");
        let refresh = format!("refresh-{n}");
        *self.valid_access.lock().unwrap() = Some(access.clone());
        *self.valid_refresh.lock().unwrap() = Some(refresh.clone());
        (access, refresh)
    }

    /// Invalidate the current access token, keeping the refresh token.
    pub fn expire_access(&self) {
        *self.valid_access.lock().unwrap() = None;
    }

    pub fn valid_access(&self) -> Option<String> {
        self.valid_access.lock().unwrap().clone()
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let presented = bearer(headers);
        let valid = self.valid_access.lock().unwrap().clone();
        presented.is_some() && presented == valid
    }
}

/// Mock backend listening on an ephemeral port; stops on drop.
pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[allow(dead_code)]
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState::default());

    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh-token", post(refresh))
        .route("/auth/forgot-password", post(accepted))
        .route("/auth/change-password", post(change_password))
        .route("/auth/providers", get(providers))
        .route("/auth/oauth/{provider}/callback", post(oauth_callback))
        .route("/users/me", get(me))
        .route("/words", get(words))
        .route("/slow-words", get(slow_words))
        .route("/errors/{status}", get(error_status))
        .route("/upload", post(upload))
        .with_state(state.clone());

    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{addr}/api"),
        state,
        handle,
    }
}

/// Test config pointing at `base_url`, with short retry delays.
#[allow(dead_code)]
pub fn test_config(base_url: &str) -> Config {
    Config {
        retry_delay: Duration::from_millis(10),
        ..Config::default()
    }
    .with_api_base_url(base_url)
    .unwrap()
}

/// Fresh client stack over in-memory storage.
#[allow(dead_code)]
pub fn test_context(backend: &MockBackend) -> (AuthContext, Arc<RecordingNavigator>) {
    test_context_with_storage(backend, Arc::new(MemoryStorage::new()))
}

#[allow(dead_code)]
pub fn test_context_with_storage(
    backend: &MockBackend,
    storage: Arc<dyn KeyValueStorage>,
) -> (AuthContext, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::new());
    let ctx = AuthContext::new(test_config(&backend.base_url), storage, navigator.clone()).unwrap();
    (ctx, navigator)
}

/// Client stack already signed in through the session store.
#[allow(dead_code)]
pub async fn signed_in_context(backend: &MockBackend) -> (AuthContext, Arc<RecordingNavigator>) {
    let (ctx, navigator) = test_context(backend);
    ctx.session
        .login(&vocab_session::models::LoginCredentials::new(
            "ana@example.com",
            PASSWORD,
        ))
        .await
        .unwrap();
    (ctx, navigator)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn tokens_body(access: &str, refresh: &str) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "access_token": access,
            "refresh_token": refresh,
            "token_type": "bearer"
        }
    }))
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    if body["password"] != PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Invalid credentials" })),
        )
            .into_response();
    }
    let (access, refresh) = state.issue();
    if state.login_omits_refresh.load(Ordering::SeqCst) {
        return Json(json!({
            "success": true,
            "data": { "access_token": access, "token_type": "bearer" }
        }))
        .into_response();
    }
    tokens_body(&access, &refresh).into_response()
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.register_calls.fetch_add(1, Ordering::SeqCst);
    if state.register_returns_tokens.load(Ordering::SeqCst) {
        let (access, refresh) = state.issue();
        return tokens_body(&access, &refresh).into_response();
    }
    Json(json!({
        "success": true,
        "data": { "id": 9, "email": body["email"], "username": body["username"] },
        "message": "Registered"
    }))
    .into_response()
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_logout.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({ "success": true })).into_response()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst) as u64;
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if state.fail_refresh.load(Ordering::SeqCst) {
        return unauthorized("Refresh token expired");
    }

    let presented = body["refresh_token"].as_str().map(str::to_string);
    let valid = state.valid_refresh.lock().unwrap().clone();
    if presented.is_none() || presented != valid {
        return unauthorized("Invalid refresh token");
    }

    let (access, refresh) = state.issue();
    tokens_body(&access, &refresh).into_response()
}

async fn accepted() -> Json<Value> {
    Json(json!({ "success": true, "message": "Email sent" }))
}

async fn change_password(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !state.authorized(&headers) {
        return unauthorized("Not authenticated");
    }
    Json(json!({ "success": true })).into_response()
}

async fn providers() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [
            { "name": "google", "label": "Google" },
            { "name": "github", "label": "GitHub", "enabled": false }
        ]
    }))
}

async fn oauth_callback(
    State(state): State<Arc<MockState>>,
    Path(provider): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    if provider != "google" || body["code"] != "good-code" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "OAuth exchange failed" })),
        )
            .into_response();
    }
    let (access, refresh) = state.issue();
    tokens_body(&access, &refresh).into_response()
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return unauthorized("Token expired");
    }
    if state.fail_me.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "message": "boom" })),
        )
            .into_response();
    }
    let role_id = if state.admin.load(Ordering::SeqCst) { 1 } else { 2 };
    Json(json!({
        "success": true,
        "data": {
            "id": 7,
            "email": "ana@example.com",
            "username": "ana",
            "full_name": "Ana Lopez",
            "role_id": role_id,
            "is_active": true,
            "created_at": "2025-01-01T00:00:00Z"
        }
    }))
    .into_response()
}

async fn words(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.words_calls.fetch_add(1, Ordering::SeqCst);
    state.words_auth.lock().unwrap().push(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
    );

    if state.words_always_unauthorized.load(Ordering::SeqCst) || !state.authorized(&headers) {
        return unauthorized("Token expired");
    }
    Json(json!({ "success": true, "data": ["apple", "pear"] })).into_response()
}

async fn slow_words(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    tokio::time::sleep(Duration::from_millis(200)).await;
    words(State(state), headers).await
}

async fn error_status(State(state): State<Arc<MockState>>, Path(status): Path<u16>) -> Response {
    state.error_calls.fetch_add(1, Ordering::SeqCst);
    let code = StatusCode::from_u16(status).unwrap();
    match status {
        400 => (
            code,
            Json(json!({ "message": "Bad word", "detail": "ignored", "error": "ignored" })),
        )
            .into_response(),
        409 => (code, Json(json!({ "detail": "Word already exists" }))).into_response(),
        418 => (code, Json(json!({ "error": "I'm a teapot" }))).into_response(),
        422 => (
            code,
            Json(json!({ "detail": [{ "loc": ["body", "word"], "msg": "field required" }] })),
        )
            .into_response(),
        _ => code.into_response(),
    }
}

async fn upload(State(state): State<Arc<MockState>>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    if !state.authorized(&headers) {
        return unauthorized("Token expired");
    }
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.unwrap();
            return Json(json!({
                "success": true,
                "data": {
                    "file_name": file_name,
                    "content_type": content_type,
                    "size": bytes.len()
                }
            }))
            .into_response();
        }
    }
    (StatusCode::BAD_REQUEST, Json(json!({ "message": "file part missing" }))).into_response()
}
