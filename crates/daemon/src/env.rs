// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Protocol version (from Cargo.toml).
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("cannot determine a state directory (set ENS_STATE_DIR or HOME)")]
    NoStateDir,
    #[error("unknown state store backend: {0} (expected memory|file)")]
    UnknownStore(String),
}

/// Resolve state directory: ENS_STATE_DIR > XDG_STATE_HOME/ens > ~/.local/state/ens
pub fn state_dir() -> Result<PathBuf, EnvError> {
    if let Ok(dir) = std::env::var("ENS_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("ens"));
    }
    let home = std::env::var("HOME").map_err(|_| EnvError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/ens"))
}

/// Persistence backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    Memory,
    #[default]
    File,
}

/// `ENS_STATE_STORE=memory|file` (default file).
pub fn state_store() -> Result<StoreKind, EnvError> {
    match std::env::var("ENS_STATE_STORE") {
        Err(_) => Ok(StoreKind::default()),
        Ok(value) => match value.as_str() {
            "memory" => Ok(StoreKind::Memory),
            "file" | "" => Ok(StoreKind::File),
            other => Err(EnvError::UnknownStore(other.to_string())),
        },
    }
}

/// Default IPC timeout (`ENS_IPC_TIMEOUT_MS`, default 5s).
pub fn ipc_timeout() -> Duration {
    std::env::var("ENS_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Shutdown drain timeout (`ENS_DRAIN_TIMEOUT_MS`, default 5s).
pub fn drain_timeout() -> Duration {
    std::env::var("ENS_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
