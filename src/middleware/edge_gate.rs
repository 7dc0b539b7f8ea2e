// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token-presence gate that runs before any page handler.
//!
//! Only checks whether an access token is present. Roles are left to the
//! in-page guard, since a bare cookie carries no claims.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    Router,
};
use axum_extra::extract::cookie::CookieJar;

use crate::routes::{Area, ADMIN_DASHBOARD, DASHBOARD};
use crate::storage::cookie::AUTH_COOKIE_NAME;

/// Middleware redirecting (307) before the page runs:
/// - protected area without a token → that area's login page
/// - guest-only page with a token → the matching dashboard
pub async fn edge_gate(jar: CookieJar, request: Request, next: Next) -> Response {
    let has_token = request_token(&jar, request.headers()).is_some();
    let path = request.uri().path();

    match edge_redirect(path, has_token) {
        Some(target) => {
            tracing::debug!(path, target, has_token, "Edge gate redirect");
            Redirect::temporary(target).into_response()
        }
        None => next.run(request).await,
    }
}

/// Redirect target for `path`, if any.
pub fn edge_redirect(path: &str, has_token: bool) -> Option<&'static str> {
    let area = Area::classify(path);
    if !has_token {
        return area.login_path();
    }
    match area {
        Area::Guest => Some(DASHBOARD),
        Area::AdminGuest => Some(ADMIN_DASHBOARD),
        _ => None,
    }
}

/// Token from the cookie first, then a bearer header.
fn request_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(AUTH_COOKIE_NAME).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Wrap `router` with the edge gate.
pub fn protect<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn(edge_gate))
}
