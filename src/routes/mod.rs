// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application paths, their access areas and navigation.

use std::sync::{Mutex, PoisonError};

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const REGISTER: &str = "/register";
pub const DASHBOARD: &str = "/dashboard";
pub const ADMIN_INDEX: &str = "/admin";
pub const ADMIN_LOGIN: &str = "/admin/login";
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";

/// Prefixes of the areas reserved for signed-in users.
const USER_PREFIXES: [&str; 3] = ["/dashboard", "/learn", "/settings"];

/// Access area of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    /// Open to everyone.
    Public,
    /// Signed-in users only.
    User,
    /// Admins only.
    Admin,
    /// `/admin` itself, which only forwards.
    AdminIndex,
    /// Login and registration for regular users.
    Guest,
    /// Admin login.
    AdminGuest,
}

impl Area {
    pub fn classify(path: &str) -> Self {
        let path = normalize(path);

        match path {
            LOGIN | REGISTER => return Area::Guest,
            ADMIN_LOGIN => return Area::AdminGuest,
            ADMIN_INDEX => return Area::AdminIndex,
            _ => {}
        }

        if has_prefix(path, ADMIN_INDEX) {
            return Area::Admin;
        }

        if USER_PREFIXES.iter().any(|prefix| has_prefix(path, prefix)) {
            return Area::User;
        }

        Area::Public
    }

    /// Login page for an area that requires authentication.
    pub fn login_path(self) -> Option<&'static str> {
        match self {
            Area::User => Some(LOGIN),
            Area::Admin | Area::AdminIndex => Some(ADMIN_LOGIN),
            Area::Public | Area::Guest | Area::AdminGuest => None,
        }
    }
}

/// Strip the query string and any trailing slash (except for `/`).
fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => path,
    }
}

/// `path` equals `prefix` or is below it.
fn has_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Where the session layer sends the user.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Logs navigations; used by the CLI where there is nothing to redirect.
#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, path: &str) {
        tracing::info!(path, "Navigating");
    }
}

/// Records every navigation in order.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
