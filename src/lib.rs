// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Vocab-Session: client-side authentication and session core
//!
//! This crate keeps the access/refresh tokens of a vocabulary-trainer
//! client, talks to the backend API with transparent token refresh, and
//! decides where navigation is allowed to go.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;

use std::sync::Arc;

use config::Config;
use error::Result;
use routes::Navigator;
use services::{ApiClient, AuthService, SessionStore};
use storage::{KeyValueStorage, TokenStore};

/// Fully wired client stack sharing one token store.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub config: Config,
    pub tokens: Arc<TokenStore>,
    pub api: Arc<ApiClient>,
    pub auth: AuthService,
    pub session: Arc<SessionStore>,
}

impl AuthContext {
    pub fn new(
        config: Config,
        storage: Arc<dyn KeyValueStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let tokens = Arc::new(TokenStore::new(storage, config.cookie_lifetime_days));
        Self::with_tokens(config, tokens, navigator)
    }

    pub fn with_tokens(
        config: Config,
        tokens: Arc<TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let api = Arc::new(ApiClient::new(&config, Arc::clone(&tokens), navigator)?);
        let auth = AuthService::new(Arc::clone(&api));
        let session = Arc::new(SessionStore::new(auth.clone()));

        Ok(Self {
            config,
            tokens,
            api,
            auth,
            session,
        })
    }
}
