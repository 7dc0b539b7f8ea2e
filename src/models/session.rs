// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session snapshot observed by guards and pages.

use serde::{Deserialize, Serialize};

use super::User;

/// Current authentication state.
///
/// Fields are private so `is_authenticated` can only be true when both a
/// user and an access token are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
    access_token: Option<String>,
    is_authenticated: bool,
    is_loading: bool,
}

impl Session {
    /// Unauthenticated, not loading.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User, access_token: String) -> Self {
        Self {
            user: Some(user),
            access_token: Some(access_token),
            is_authenticated: true,
            is_loading: false,
        }
    }

    pub fn with_loading(mut self, is_loading: bool) -> Self {
        self.is_loading = is_loading;
        self
    }

    /// Swap in a rotated access token. Unauthenticated sessions are left
    /// alone. Returns whether anything changed.
    pub fn rotate_token(&mut self, access_token: &str) -> bool {
        if !self.is_authenticated || self.access_token.as_deref() == Some(access_token) {
            return false;
        }
        self.access_token = Some(access_token.to_string());
        true
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated && self.user.as_ref().is_some_and(User::is_admin)
    }

    /// Blob written to storage for instant rehydration.
    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            user: self.user.clone(),
            token: self.access_token.clone(),
            is_authenticated: self.is_authenticated,
        }
    }

    /// Rebuild a session from a persisted blob, dropping inconsistent claims.
    pub fn from_persisted(blob: PersistedSession) -> Self {
        match (blob.is_authenticated, blob.user, blob.token) {
            (true, Some(user), Some(token)) => Self::authenticated(user, token),
            _ => Self::empty(),
        }
    }
}

/// `{ user, token, isAuthenticated }` as stored under the session key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            email: "ana@example.com".to_string(),
            username: "ana".to_string(),
            full_name: None,
            role_id: Some(2),
            is_active: true,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn test_persisted_round_trip_keeps_authentication() {
        let session = Session::authenticated(user(), "tok".to_string());
        let json = serde_json::to_string(&session.to_persisted()).unwrap();
        assert!(json.contains("\"isAuthenticated\":true"));

        let blob: PersistedSession = serde_json::from_str(&json).unwrap();
        assert_eq!(Session::from_persisted(blob), session);
    }

    #[test]
    fn test_inconsistent_blob_is_downgraded() {
        let blob = PersistedSession {
            user: None,
            token: Some("tok".to_string()),
            is_authenticated: true,
        };
        let session = Session::from_persisted(blob);
        assert!(!session.is_authenticated());
        assert!(session.access_token().is_none());
    }

    #[test]
    fn test_rotate_token_only_when_authenticated() {
        let mut session = Session::authenticated(user(), "tok".to_string());
        assert!(!session.rotate_token("tok"));
        assert!(session.rotate_token("tok-2"));
        assert_eq!(session.access_token(), Some("tok-2"));

        let mut empty = Session::empty();
        assert!(!empty.rotate_token("tok"));
        assert!(empty.access_token().is_none());
    }
}
