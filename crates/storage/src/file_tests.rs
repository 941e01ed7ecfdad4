// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{SessionStore, StoreError};
use ens_core::test_support::session_with_user;
use ens_core::Priority;
use tempfile::TempDir;

async fn open_store() -> (TempDir, FileStore) {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path().join("sessions")).await.unwrap();
    (dir, store)
}

#[tokio::test]
async fn set_get_round_trips_through_disk() {
    let (_dir, store) = open_store().await;
    let mut session = session_with_user("u1");
    session.enqueue_prompt("u1", "later", Priority::Normal, 2, 10).unwrap();
    session.enqueue_prompt("u1", "now", Priority::Urgent, 3, 10).unwrap();
    let id = session.id.clone();

    store.set(session.clone()).await.unwrap();
    let loaded = store.get(&id).await.unwrap().unwrap();

    session.normalize();
    assert_eq!(loaded, session);
}

#[tokio::test]
async fn missing_session_is_none() {
    let (_dir, store) = open_store().await;
    assert!(store.get(&"ses_nope".into()).await.unwrap().is_none());
    assert!(!store.has(&"ses_nope".into()).await.unwrap());
}

#[tokio::test]
async fn rewrite_rotates_backup() {
    let (_dir, store) = open_store().await;
    let mut session = session_with_user("u1");
    let id = session.id.clone();

    store.set(session.clone()).await.unwrap();
    session.state.version = 1;
    store.set(session).await.unwrap();

    let bak = sibling(&store.path_for(&id), ".bak");
    assert!(bak.exists());
    // The live file holds the newer version.
    let loaded = store.get(&id).await.unwrap().unwrap();
    assert_eq!(loaded.state.version, 1);
}

#[tokio::test]
async fn all_skips_backups_and_counts_live_files() {
    let (_dir, store) = open_store().await;
    let a = session_with_user("u1");
    let mut b = session_with_user("u2");
    store.set(a.clone()).await.unwrap();
    store.set(b.clone()).await.unwrap();
    // Rewrite to create a .bak alongside the live files.
    b.state.version = 3;
    store.set(b).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn delete_removes_file() {
    let (_dir, store) = open_store().await;
    let session = session_with_user("u1");
    let id = session.id.clone();
    store.set(session).await.unwrap();

    assert!(store.delete(&id).await.unwrap());
    assert!(!store.delete(&id).await.unwrap());
}

#[tokio::test]
async fn corrupt_file_surfaces_an_error() {
    let (_dir, store) = open_store().await;
    let session = session_with_user("u1");
    let id = session.id.clone();
    store.set(session).await.unwrap();

    tokio::fs::write(store.path_for(&id), b"not zstd").await.unwrap();
    assert!(store.get(&id).await.is_err());
}

#[tokio::test]
async fn close_makes_store_unusable() {
    let (_dir, store) = open_store().await;
    store.close().await.unwrap();
    assert!(matches!(store.all().await, Err(StoreError::Closed)));
}

#[tokio::test]
async fn reopen_sees_persisted_sessions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sessions");
    let session = session_with_user("u1");
    let id = session.id.clone();

    {
        let store = FileStore::open(path.clone()).await.unwrap();
        store.set(session).await.unwrap();
        store.close().await.unwrap();
    }

    let store = FileStore::open(path.clone()).await.unwrap();
    assert!(store.get(&id).await.unwrap().is_some());
}
