// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed session store.
//!
//! One zstd-compressed JSON document per session, `{id}.json.zst` under the
//! store directory. Replace is atomic: serialize to `{id}.json.zst.tmp`,
//! rotate the previous file to `.bak`, rename the tmp file into place.
//!
//! A relational backend behind the same trait would map the aggregate onto
//! `sessions` / `session_users` / `session_clients` / `session_prompts`
//! tables (children cascading on delete) and perform `set` as one
//! transaction: UPSERT parent, DELETE children by session_id, bulk-INSERT
//! new children, COMMIT.

use crate::{SessionStore, StoreError};
use async_trait::async_trait;
use ens_core::{Session, SessionId};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

const EXT: &str = "json.zst";
const COMPRESSION_LEVEL: i32 = 3;

/// Number of `.bak` generations kept per session file.
const MAX_BAK_FILES: u32 = 3;

/// Directory-of-files store for single-node deployments.
pub struct FileStore {
    dir: PathBuf,
    closed: AtomicBool,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir, closed: AtomicBool::new(false) })
    }

    fn guard(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{id}.{EXT}"))
    }

    fn decode(bytes: &[u8]) -> Result<Session, StoreError> {
        let json = zstd::decode_all(bytes)?;
        Ok(serde_json::from_slice(&json)?)
    }

    fn encode(session: &Session) -> Result<Vec<u8>, StoreError> {
        let json = serde_json::to_vec(session)?;
        Ok(zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)?)
    }
}

/// Append a suffix to the full file name (`with_extension` would clobber
/// part of the `.json.zst` double extension).
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
/// The oldest backup is removed when the limit is reached.
async fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            sibling(path, ".bak")
        } else {
            sibling(path, &format!(".bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if tokio::fs::try_exists(&oldest).await.unwrap_or(false) {
        let _ = tokio::fs::remove_file(&oldest).await;
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if tokio::fs::try_exists(&src).await.unwrap_or(false) {
            let _ = tokio::fs::rename(&src, bak(n + 1)).await;
        }
    }

    bak(1)
}

#[async_trait]
impl SessionStore for FileStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        self.guard()?;
        let path = self.path_for(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(Self::decode(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, mut session: Session) -> Result<(), StoreError> {
        self.guard()?;
        session.normalize();
        let path = self.path_for(&session.id);
        let bytes = Self::encode(&session)?;

        let tmp = sibling(&path, ".tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let bak = rotate_bak_path(&path).await;
            if let Err(e) = tokio::fs::rename(&path, &bak).await {
                warn!(session = %session.id, error = %e, "failed to rotate backup");
            }
        }
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError> {
        self.guard()?;
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn has(&self, id: &SessionId) -> Result<bool, StoreError> {
        self.guard()?;
        Ok(tokio::fs::try_exists(self.path_for(id)).await?)
    }

    async fn all(&self) -> Result<Vec<Session>, StoreError> {
        self.guard()?;
        let mut sessions = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.ends_with(&format!(".{EXT}")) {
                continue;
            }
            let bytes = tokio::fs::read(entry.path()).await?;
            sessions.push(Self::decode(&bytes)?);
        }
        Ok(sessions)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.all().await?.len())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.guard()?;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                tokio::fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
