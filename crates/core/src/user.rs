// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Users and connected clients.
//!
//! A User is a human collaborator on a session, identified by the platform's
//! auth layer. UserId is therefore opaque here: it is never generated by the
//! core, only carried. Clients are the individual connections (web tab,
//! Slack thread, phone) a user holds open against one session.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt;

/// Identity of a collaborator, assigned upstream by the auth layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(SmolStr);

impl UserId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for UserId {
    fn eq(&self, other: &str) -> bool {
        self.0.as_str() == other
    }
}

impl PartialEq<&str> for UserId {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_str() == *other
    }
}

impl Borrow<str> for UserId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

crate::define_id! {
    /// Unique identifier for one client connection.
    pub struct ClientId("cli_");
}

/// Where a client connection comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    Web,
    Slack,
    Chrome,
    Mobile,
    Voice,
}

crate::simple_display! {
    ClientKind {
        Web => "web",
        Slack => "slack",
        Chrome => "chrome",
        Mobile => "mobile",
        Voice => "voice",
    }
}

/// A collaborator's cursor position, broadcast for presence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

/// A human collaborator on a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Presence color assigned at join time.
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    pub joined_at_ms: u64,
    /// Refreshed on cursor moves and client disconnects.
    #[serde(default)]
    pub last_active_ms: u64,
}

impl User {
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>, joined_at_ms: u64) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: None,
            avatar: None,
            color: String::new(),
            cursor: None,
            joined_at_ms,
            last_active_ms: joined_at_ms,
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    crate::optional_setters! {
        email: String,
        avatar: String,
    }
}

/// One live connection a user holds against a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub user_id: UserId,
    pub kind: ClientKind,
    pub connected_at_ms: u64,
    pub last_activity_ms: u64,
}

impl Client {
    pub fn new(user_id: impl Into<UserId>, kind: ClientKind, connected_at_ms: u64) -> Self {
        Self {
            id: ClientId::generate(),
            user_id: user_id.into(),
            kind,
            connected_at_ms,
            last_activity_ms: connected_at_ms,
        }
    }
}

#[cfg(test)]
#[path = "user_tests.rs"]
mod tests;
