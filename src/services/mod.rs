// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - API client, auth endpoints and session state.

pub mod api_client;
pub mod auth;
pub mod refresh;
pub mod session;

pub use api_client::{ApiClient, FileUpload, RetryPolicy};
pub use auth::AuthService;
pub use refresh::RefreshCoordinator;
pub use session::{RefreshTimer, SessionStore};
