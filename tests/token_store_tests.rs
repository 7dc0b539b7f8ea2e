// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token store persistence tests.

use std::sync::Arc;
use vocab_session::storage::{keys, FileStorage, KeyValueStorage, TokenStore};

#[test]
fn test_tokens_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.json");

    {
        let store = TokenStore::new(Arc::new(FileStorage::open(&path).unwrap()), 7);
        store.set_tokens("access-1", Some("refresh-1"));
    }

    let store = TokenStore::new(Arc::new(FileStorage::open(&path).unwrap()), 7);
    assert!(store.is_authenticated());
    assert_eq!(store.get_refresh_token().as_deref(), Some("refresh-1"));
    assert_eq!(store.credential().unwrap().header, "Bearer access-1");
}

#[test]
fn test_clear_removes_tokens_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.json");

    let storage = Arc::new(FileStorage::open(&path).unwrap());
    let store = TokenStore::new(storage, 7);
    store.set_tokens("access-1", Some("refresh-1"));
    store.clear_tokens();

    let reopened = FileStorage::open(&path).unwrap();
    assert_eq!(reopened.get(keys::ACCESS_TOKEN), None);
    assert_eq!(reopened.get(keys::REFRESH_TOKEN), None);
}

#[test]
fn test_stale_refresh_write_after_clear_is_dropped() {
    let store = TokenStore::in_memory();
    store.set_tokens("access-1", Some("refresh-1"));

    let generation = store.generation();
    store.clear_tokens();

    assert!(!store.set_tokens_if_generation(generation, "access-2", Some("refresh-2")));
    assert!(!store.is_authenticated());
    assert!(store.credential().is_none());
    assert_eq!(store.cookie().value(), None);
}
