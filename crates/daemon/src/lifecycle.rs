// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! Resolves the state directory, takes the daemon lock, builds the store
//! and provider from the environment, wires the engine, and serves the
//! socket until a shutdown request arrives.

use crate::env::{self, StoreKind};
use crate::listener::{ListenCtx, Listener};
use crate::runner::SandboxAgentRunner;
use ens_core::SystemClock;
use ens_engine::{Engine, EngineConfig};
use ens_provider::{LocalProvider, SandboxProvider};
use ens_storage::{FileStore, MemoryStore, SessionStore};
use fs2::FileExt;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Env(#[from] env::EnvError),
    #[error("another daemon already holds {0}")]
    AlreadyRunning(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] ens_storage::StoreError),
    #[error("provider error: {0}")]
    Provider(#[from] ens_provider::ProviderError),
}

/// Acquire the single-daemon lock file.
fn take_lock(dir: &Path) -> Result<File, DaemonError> {
    let path = dir.join("ensd.lock");
    let file = File::create(&path)?;
    file.try_lock_exclusive()
        .map_err(|_| DaemonError::AlreadyRunning(path.display().to_string()))?;
    Ok(file)
}

async fn open_store(kind: StoreKind, dir: &Path) -> Result<Arc<dyn SessionStore>, DaemonError> {
    Ok(match kind {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::File => Arc::new(FileStore::open(dir.join("sessions")).await?),
    })
}

/// Run the daemon until shutdown. Holds the lock file for its lifetime.
pub async fn run() -> Result<(), DaemonError> {
    let state_dir = env::state_dir()?;
    std::fs::create_dir_all(&state_dir)?;
    let _lock = take_lock(&state_dir)?;

    let store_kind = env::state_store()?;
    let store = open_store(store_kind, &state_dir).await?;
    let provider: Arc<dyn SandboxProvider> =
        Arc::new(LocalProvider::open(state_dir.join("sandboxes")).await?);
    let runner = SandboxAgentRunner::new(Arc::clone(&provider));

    let engine = Engine::start(
        Arc::clone(&store),
        provider,
        runner,
        SystemClock,
        EngineConfig::default(),
    );

    let socket_path = state_dir.join("ensd.sock");
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    let unix = UnixListener::bind(&socket_path)?;
    info!(socket = %socket_path.display(), store = ?store_kind, "daemon listening");

    let shutdown = Arc::new(Notify::new());
    let cancel = CancellationToken::new();
    let ctx = Arc::new(ListenCtx {
        engine: Arc::clone(&engine),
        start_time: Instant::now(),
        shutdown: Arc::clone(&shutdown),
    });
    let listener_task =
        tokio::spawn(Listener::new(unix, ctx, cancel.clone()).run());

    tokio::select! {
        _ = shutdown.notified() => info!("shutdown requested"),
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    cancel.cancel();
    let _ = tokio::time::timeout(env::drain_timeout(), listener_task).await;
    engine.shutdown();
    store.close().await?;
    let _ = std::fs::remove_file(&socket_path);
    info!("daemon stopped");
    Ok(())
}
