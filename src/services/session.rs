// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Observable session state and its transitions.
//!
//! Loading happens in two phases: [`SessionStore::hydrate`] publishes the
//! persisted session synchronously (marked loading while a stored token still
//! needs checking) and [`SessionStore::initialize_auth`] reconciles it with
//! the backend.
//!
//! Token rotations written by the HTTP client's refresh are followed as they
//! happen, so the published session never carries a stale access token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{ClientError, Result};
use crate::models::{LoginCredentials, PersistedSession, RegisterCredentials, Session};
use crate::services::auth::AuthService;
use crate::storage::{keys, KeyValueStorage, TokenStore};

pub struct SessionStore {
    auth: AuthService,
    tokens: Arc<TokenStore>,
    state: Arc<watch::Sender<Session>>,
    /// Serializes `initialize_auth` calls.
    init_lock: Mutex<()>,
    initialized: AtomicBool,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.state.borrow())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(auth: AuthService) -> Self {
        let tokens = Arc::clone(auth.api().tokens());
        let (state, _) = watch::channel(Session::empty());
        let state = Arc::new(state);

        let follower = Arc::downgrade(&state);
        let storage = tokens.storage().cloned();
        tokens.on_token_written(move |token| {
            let Some(state) = follower.upgrade() else {
                return;
            };
            if !state.send_if_modified(|session| session.rotate_token(token)) {
                return;
            }
            tracing::debug!("Session picked up rotated access token");
            let session = state.borrow().clone();
            if let Some(storage) = &storage {
                if !session.is_loading() {
                    persist(storage.as_ref(), &session);
                }
            }
        });

        Self {
            auth,
            tokens,
            state,
            init_lock: Mutex::new(()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Publish the persisted session without any network call.
    ///
    /// With a stored access token the session is marked loading until
    /// [`initialize_auth`](Self::initialize_auth) settles it; without one it
    /// is empty.
    pub fn hydrate(&self) -> Session {
        let session = match self.tokens.get_access_token() {
            Some(_) => self
                .load_persisted()
                .map(Session::from_persisted)
                .unwrap_or_default()
                .with_loading(true),
            None => Session::empty(),
        };

        tracing::debug!(
            authenticated = session.is_authenticated(),
            loading = session.is_loading(),
            "Hydrated session"
        );
        self.publish(session.clone());
        session
    }

    /// Validate a stored token against the backend, once.
    ///
    /// Concurrent callers queue on the same lock and the later ones return
    /// the settled session without a network call. Never leaves the session
    /// loading.
    pub async fn initialize_auth(&self) -> Session {
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            return self.snapshot();
        }

        let session = if self.tokens.get_access_token().is_some() {
            self.set_loading(true);
            match self.establish().await {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(error = %e, "Stored session is no longer valid, clearing");
                    self.tokens.clear_tokens();
                    Session::empty()
                }
            }
        } else {
            Session::empty()
        };

        self.publish(session.clone());
        self.initialized.store(true, Ordering::SeqCst);
        session
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Session> {
        self.set_loading(true);
        if let Err(e) = self.auth.login(credentials).await {
            self.set_loading(false);
            return Err(e);
        }
        self.finish_sign_in().await
    }

    /// Register and sign in. Falls back to a login when registration itself
    /// returns no tokens.
    pub async fn register(&self, credentials: &RegisterCredentials) -> Result<Session> {
        self.set_loading(true);
        if let Err(e) = self.auth.register(credentials).await {
            self.set_loading(false);
            return Err(e);
        }
        self.finish_sign_in().await
    }

    /// End the session. Always clears local state, whatever the backend says.
    pub async fn logout(&self) {
        if self.tokens.is_authenticated() {
            self.auth.logout().await;
        }
        self.sign_out_locally();
        tracing::info!("Logged out");
    }

    /// Exchange the refresh token and re-fetch the user.
    ///
    /// Does not toggle the loading flag. Any failure signs out locally.
    pub async fn refresh_token(&self) -> Result<Session> {
        let result = match self.auth.refresh().await {
            Ok(_) => self.establish().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(session) => {
                self.publish(session.clone());
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed, signing out");
                self.sign_out_locally();
                Err(e)
            }
        }
    }

    /// Refresh every `period` while authenticated. The task stops when the
    /// returned timer or the store is dropped.
    pub fn spawn_refresh_timer(self: &Arc<Self>, period: Duration) -> RefreshTimer {
        let store: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                if !store.snapshot().is_authenticated() {
                    continue;
                }

                tracing::debug!("Background session refresh");
                if let Err(e) = store.refresh_token().await {
                    tracing::warn!(error = %e, "Background refresh failed");
                }
            }
        });

        RefreshTimer { handle }
    }

    /// Fetch the user for the stored token and mirror the cookie.
    async fn establish(&self) -> Result<Session> {
        let user = self.auth.get_current_user().await?;

        // Re-read: the fetch may have refreshed the token, or a logout may
        // have cleared it.
        let token = self.tokens.get_access_token().ok_or(ClientError::NoToken)?;
        self.tokens.mirror_cookie(&token);

        Ok(Session::authenticated(user, token))
    }

    /// Tokens are already stored; load the user or discard them.
    async fn finish_sign_in(&self) -> Result<Session> {
        match self.establish().await {
            Ok(session) => {
                self.publish(session.clone());
                self.initialized.store(true, Ordering::SeqCst);
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not load the signed-in user, discarding tokens");
                self.sign_out_locally();
                Err(e)
            }
        }
    }

    fn sign_out_locally(&self) {
        self.tokens.clear_tokens();
        self.publish(Session::empty());
        self.initialized.store(false, Ordering::SeqCst);
    }

    fn set_loading(&self, loading: bool) {
        self.publish(self.snapshot().with_loading(loading));
    }

    fn publish(&self, session: Session) {
        if !session.is_loading() {
            if let Some(storage) = self.tokens.storage() {
                persist(storage.as_ref(), &session);
            }
        }
        self.state.send_replace(session);
    }

    fn load_persisted(&self) -> Option<PersistedSession> {
        let json = self.tokens.storage()?.get(keys::SESSION)?;
        match serde_json::from_str(&json) {
            Ok(blob) => Some(blob),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable persisted session");
                None
            }
        }
    }
}

fn persist(storage: &dyn KeyValueStorage, session: &Session) {
    match serde_json::to_string(&session.to_persisted()) {
        Ok(json) => storage.set(keys::SESSION, &json),
        Err(e) => tracing::warn!(error = %e, "Failed to encode session"),
    }
}

/// Background refresh task; aborted on drop.
#[derive(Debug)]
pub struct RefreshTimer {
    handle: JoinHandle<()>,
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
