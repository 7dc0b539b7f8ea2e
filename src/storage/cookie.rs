// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-token cookie mirror read by the edge gate.

use axum_extra::extract::cookie::{Cookie, SameSite};
use std::sync::{PoisonError, RwLock};

/// Cookie name shared with the edge gate.
pub const AUTH_COOKIE_NAME: &str = "auth-token";

/// Build the mirrored cookie: path `/`, `SameSite=Lax`, `Max-Age` in days.
pub fn build_auth_cookie(token: &str, lifetime_days: i64) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, token.to_string()))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(lifetime_days))
        .build()
}

/// Removal cookie with the same name and path as the mirrored one.
pub fn build_removal_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, ""))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

#[derive(Debug, Default)]
struct MirrorState {
    value: Option<String>,
    set_cookie: Option<String>,
}

/// Holds the current mirrored cookie and its last `Set-Cookie` rendering.
#[derive(Debug)]
pub struct CookieMirror {
    lifetime_days: i64,
    state: RwLock<MirrorState>,
}

impl CookieMirror {
    pub fn new(lifetime_days: i64) -> Self {
        Self {
            lifetime_days,
            state: RwLock::new(MirrorState::default()),
        }
    }

    pub fn set(&self, token: &str) {
        let cookie = build_auth_cookie(token, self.lifetime_days);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.value = Some(token.to_string());
        state.set_cookie = Some(cookie.to_string());
    }

    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.value = None;
        state.set_cookie = Some(build_removal_cookie().to_string());
    }

    /// Mirrored token, if the cookie is currently set.
    pub fn value(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    /// Last `Set-Cookie` value written (set or removal).
    pub fn set_cookie_header(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .set_cookie
            .clone()
    }

    /// `Cookie:` request header value carrying the mirrored token.
    pub fn request_header(&self) -> Option<String> {
        self.value()
            .map(|token| Cookie::new(AUTH_COOKIE_NAME, token).encoded().to_string())
    }
}
