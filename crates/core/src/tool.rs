// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool classification for the git-sync gate.
//!
//! The division is a closed set: read-class tools are always admitted,
//! write-class tools are gated on git sync. Unknown tool names are rejected
//! at the boundary rather than guessed at.

use serde::{Deserialize, Serialize};

/// Tools that only inspect the working tree.
pub const READ_TOOLS: &[&str] = &["read", "glob", "grep", "ls", "codesearch"];

/// Tools that mutate the working tree or run arbitrary commands.
pub const WRITE_TOOLS: &[&str] = &["edit", "write", "patch", "multiedit", "bash"];

/// Admission class of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolClass {
    Read,
    Write,
}

crate::simple_display! {
    ToolClass {
        Read => "read",
        Write => "write",
    }
}

/// Classify a tool name. `None` for tools outside the known sets.
pub fn classify_tool(name: &str) -> Option<ToolClass> {
    if READ_TOOLS.contains(&name) {
        Some(ToolClass::Read)
    } else if WRITE_TOOLS.contains(&name) {
        Some(ToolClass::Write)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
