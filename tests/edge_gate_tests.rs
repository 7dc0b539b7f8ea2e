// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Edge gate tests.
//!
//! These tests verify that:
//! 1. Protected areas without a token redirect to the right login page
//! 2. Guest-only pages with a token redirect to the right dashboard
//! 3. The mirrored cookie and a bearer header both count as a token

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    routing::get,
    Router,
};
use tower::ServiceExt;
use vocab_session::middleware::edge_gate::protect;
use vocab_session::storage::CookieMirror;

fn pages() -> Router {
    let router = Router::new()
        .route("/", get(|| async { "home" }))
        .route("/about", get(|| async { "about" }))
        .route("/login", get(|| async { "login" }))
        .route("/register", get(|| async { "register" }))
        .route("/dashboard", get(|| async { "dashboard" }))
        .route("/learn/{deck}", get(|| async { "learn" }))
        .route("/admin", get(|| async { "admin" }))
        .route("/admin/login", get(|| async { "admin login" }))
        .route("/admin/dashboard", get(|| async { "admin dashboard" }));
    protect(router)
}

async fn visit(path: &str, cookie: Option<&str>, bearer: Option<&str>) -> (StatusCode, Option<String>) {
    let mut request = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let response = pages()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|h| h.to_str().unwrap().to_string());
    (response.status(), location)
}

#[tokio::test]
async fn test_protected_pages_without_token_redirect_to_login() {
    for (path, target) in [
        ("/dashboard", "/login"),
        ("/learn/42", "/login"),
        ("/admin", "/admin/login"),
        ("/admin/dashboard", "/admin/login"),
    ] {
        let (status, location) = visit(path, None, None).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(location.as_deref(), Some(target), "{path}");
    }
}

#[tokio::test]
async fn test_public_and_guest_pages_without_token_pass() {
    for path in ["/", "/about", "/login", "/register", "/admin/login"] {
        let (status, location) = visit(path, None, None).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(location, None);
    }
}

#[tokio::test]
async fn test_guest_pages_with_cookie_redirect_home() {
    let mirror = CookieMirror::new(7);
    mirror.set("access-1");
    let cookie = mirror.request_header().unwrap();

    let (status, location) = visit("/login", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("/dashboard"));

    let (status, location) = visit("/admin/login", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("/admin/dashboard"));
}

#[tokio::test]
async fn test_protected_pages_with_token_pass() {
    let (status, _) = visit("/dashboard", Some("auth-token=access-1"), None).await;
    assert_eq!(status, StatusCode::OK);

    // Role checks are left to the in-page guard
    let (status, _) = visit("/admin/dashboard", None, Some("access-1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cleared_cookie_counts_as_no_token() {
    let (status, location) = visit("/dashboard", Some("auth-token="), None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("/login"));
}
