// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single source of truth for the access and refresh tokens.
//!
//! Every write goes storage first, then the default `Authorization` credential
//! used by the HTTP client, then the cookie mirror. A store created with
//! [`TokenStore::detached`] has no storage and every operation is a no-op.
//!
//! [`TokenStore::set_tokens`] is for refresh responses and keeps a refresh
//! token the backend did not rotate; [`TokenStore::replace_tokens`] starts a
//! new session and never inherits the previous one's refresh token.

use reqwest::header::HeaderValue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::cookie::CookieMirror;
use super::{keys, KeyValueStorage, MemoryStorage};
use crate::config::COOKIE_LIFETIME_DAYS;

/// Access token together with its pre-built `Authorization` header value.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub header: HeaderValue,
}

impl Credential {
    /// `Bearer <token>` credential, or `None` if the token is not a valid
    /// header value.
    pub fn bearer(token: &str) -> Option<Self> {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut header) => {
                header.set_sensitive(true);
                Some(Self {
                    token: token.to_string(),
                    header,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Access token is not a valid header value");
                None
            }
        }
    }
}

type TokenListener = Box<dyn Fn(&str) + Send + Sync>;

pub struct TokenStore {
    storage: Option<Arc<dyn KeyValueStorage>>,
    credential: RwLock<Option<Credential>>,
    cookie: CookieMirror,
    /// Bumped on every clear so an in-flight refresh can tell it lost a race
    /// with logout.
    generation: AtomicU64,
    /// Serializes multi-step writes against clears.
    write_lock: Mutex<()>,
    listeners: RwLock<Vec<TokenListener>>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("detached", &self.storage.is_none())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Store backed by `storage`. A previously stored access token becomes
    /// the default credential immediately.
    pub fn new(storage: Arc<dyn KeyValueStorage>, cookie_lifetime_days: i64) -> Self {
        let credential = storage
            .get(keys::ACCESS_TOKEN)
            .and_then(|token| Credential::bearer(&token));

        Self {
            storage: Some(storage),
            credential: RwLock::new(credential),
            cookie: CookieMirror::new(cookie_lifetime_days),
            generation: AtomicU64::new(0),
            write_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Store over a fresh [`MemoryStorage`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), COOKIE_LIFETIME_DAYS)
    }

    /// Store with no backing storage; reads return nothing and writes are
    /// ignored.
    pub fn detached() -> Self {
        Self {
            storage: None,
            credential: RwLock::new(None),
            cookie: CookieMirror::new(COOKIE_LIFETIME_DAYS),
            generation: AtomicU64::new(0),
            write_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.storage.is_none()
    }

    /// Store a new access token and, when given, a new refresh token.
    /// Passing `None` keeps the existing refresh token.
    pub fn set_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_tokens(access_token, refresh_token);
    }

    /// Start a new session: store both tokens, dropping any stored refresh
    /// token when `refresh_token` is `None`.
    ///
    /// Bumps the generation like a clear, so a refresh started for the
    /// previous session cannot overwrite these tokens.
    pub fn replace_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(storage) = &self.storage else {
            return;
        };

        self.generation.fetch_add(1, Ordering::SeqCst);
        if refresh_token.is_none() {
            storage.remove(keys::REFRESH_TOKEN);
        }
        self.write_tokens(access_token, refresh_token);
    }

    /// Like [`set_tokens`](Self::set_tokens), but only if no clear happened
    /// since `generation` was read. Returns whether the write happened.
    pub fn set_tokens_if_generation(
        &self,
        generation: u64,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> bool {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation() != generation {
            return false;
        }
        self.write_tokens(access_token, refresh_token);
        true
    }

    fn write_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        let Some(storage) = &self.storage else {
            return;
        };

        storage.set(keys::ACCESS_TOKEN, access_token);
        if let Some(refresh_token) = refresh_token {
            storage.set(keys::REFRESH_TOKEN, refresh_token);
        }

        *self.credential.write().unwrap_or_else(PoisonError::into_inner) =
            Credential::bearer(access_token);

        self.cookie.set(access_token);

        for listener in self.listeners.read().unwrap_or_else(PoisonError::into_inner).iter() {
            listener(access_token);
        }
    }

    /// Call `listener` with the new access token after every token write.
    ///
    /// Listeners run while the store's write lock is held and must not write
    /// tokens themselves.
    pub fn on_token_written(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    pub fn get_access_token(&self) -> Option<String> {
        self.storage.as_ref()?.get(keys::ACCESS_TOKEN)
    }

    pub fn get_refresh_token(&self) -> Option<String> {
        self.storage.as_ref()?.get(keys::REFRESH_TOKEN)
    }

    /// Default credential attached to authenticated requests.
    pub fn credential(&self) -> Option<Credential> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove both tokens, the default credential and the cookie.
    pub fn clear_tokens(&self) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(storage) = &self.storage else {
            return;
        };

        self.generation.fetch_add(1, Ordering::SeqCst);

        storage.remove(keys::ACCESS_TOKEN);
        storage.remove(keys::REFRESH_TOKEN);

        *self.credential.write().unwrap_or_else(PoisonError::into_inner) = None;

        self.cookie.clear();
    }

    /// True iff an access token is stored. Says nothing about validity.
    pub fn is_authenticated(&self) -> bool {
        self.get_access_token().is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Mirror `token` into the cookie without touching storage.
    pub fn mirror_cookie(&self, token: &str) {
        if self.storage.is_some() {
            self.cookie.set(token);
        }
    }

    pub fn cookie(&self) -> &CookieMirror {
        &self.cookie
    }

    /// Backing storage, shared with the session persistence.
    pub fn storage(&self) -> Option<&Arc<dyn KeyValueStorage>> {
        self.storage.as_ref()
    }
}
