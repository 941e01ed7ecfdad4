// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot records.
//!
//! A snapshot captures a sandbox image plus its git state so a hibernated
//! session can resume against fresh code. References to the sandbox are
//! weak (by id): the sandbox is usually terminated right after the
//! snapshot is taken.

use crate::sandbox::SandboxId;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a sandbox snapshot.
    pub struct SnapshotId("snp_");
}

/// Persisted image of a sandbox and its git state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub sandbox_id: SandboxId,
    pub session_id: SessionId,
    pub git_commit: String,
    pub has_uncommitted_changes: bool,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl Snapshot {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms <= now_ms
    }
}
