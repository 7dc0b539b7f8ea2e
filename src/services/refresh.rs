// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single-flight coordination for token refresh.
//!
//! The first caller to [`RefreshCoordinator::join`] becomes the leader and
//! performs the refresh; everyone arriving while it runs is queued and
//! receives the leader's outcome. If the leader is dropped without settling
//! (for example its task is cancelled), queued callers see
//! [`ClientError::RefreshAborted`] and the coordinator returns to idle.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

use crate::error::{ClientError, Result};
use crate::models::TokenPair;

type Waiter = oneshot::Sender<Result<TokenPair>>;

#[derive(Debug, Default)]
enum RefreshState {
    #[default]
    Idle,
    Refreshing { waiters: Vec<Waiter> },
}

#[derive(Debug, Clone, Default)]
pub struct RefreshCoordinator {
    state: Arc<Mutex<RefreshState>>,
}

/// Role handed out by [`RefreshCoordinator::join`].
#[derive(Debug)]
pub enum Ticket {
    Leader(LeaderGuard),
    Follower(Follower),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Become the leader if no refresh is running, otherwise queue up.
    pub fn join(&self) -> Ticket {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *state {
            RefreshState::Idle => {
                *state = RefreshState::Refreshing {
                    waiters: Vec::new(),
                };
                Ticket::Leader(LeaderGuard {
                    state: Arc::clone(&self.state),
                    settled: false,
                })
            }
            RefreshState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Ticket::Follower(Follower { rx })
            }
        }
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            RefreshState::Refreshing { .. }
        )
    }
}

/// Held by the caller performing the refresh.
#[derive(Debug)]
pub struct LeaderGuard {
    state: Arc<Mutex<RefreshState>>,
    settled: bool,
}

impl LeaderGuard {
    /// Publish the outcome to every queued caller, in arrival order, and
    /// return to idle. The outcome is handed back to the leader.
    pub fn settle(mut self, outcome: Result<TokenPair>) -> Result<TokenPair> {
        self.settled = true;
        let waiters = self.take_waiters();

        if !waiters.is_empty() {
            tracing::debug!(
                waiters = waiters.len(),
                ok = outcome.is_ok(),
                "Settling queued refresh callers"
            );
        }
        for waiter in waiters {
            // A waiter whose caller went away is fine to skip
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }

    fn take_waiters(&self) -> Vec<Waiter> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::take(&mut *state) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if !self.settled {
            let waiters = self.take_waiters();
            tracing::warn!(
                waiters = waiters.len(),
                "Refresh abandoned before completion"
            );
            // Dropping the senders wakes followers with RefreshAborted
        }
    }
}

/// Queued caller waiting for the leader's outcome.
#[derive(Debug)]
pub struct Follower {
    rx: oneshot::Receiver<Result<TokenPair>>,
}

impl Follower {
    pub async fn wait(self) -> Result<TokenPair> {
        self.rx.await.unwrap_or(Err(ClientError::RefreshAborted))
    }
}
