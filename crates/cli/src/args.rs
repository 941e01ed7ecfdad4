// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line surface.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ens", about = "ensemble orchestration core", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground
    Daemon,
    /// Health-check the daemon
    Ping,
    /// Daemon status
    Status,
    /// Ask the daemon to shut down
    Stop,

    /// Sandbox operations
    #[command(subcommand)]
    Sandbox(SandboxCommand),
    /// Snapshot catalog operations
    #[command(subcommand)]
    Snapshots(SnapshotCommand),
    /// Warm pool operations
    #[command(subcommand)]
    Pool(PoolCommand),
    /// Background agent operations
    #[command(subcommand)]
    Agent(AgentCommand),
    /// Multiplayer session operations
    #[command(subcommand)]
    Session(SessionCommand),
    /// Prompt queue operations
    #[command(subcommand)]
    Prompt(PromptCommand),
    /// Request tool admission (blocks on un-synced writes)
    Admit { session: String, tool: String },
    /// Resolve a sandbox for a follow-up prompt
    FollowUp {
        session: String,
        #[arg(long)]
        repo: String,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        project: String,
    },
}

#[derive(Args)]
pub struct RepoArgs {
    #[arg(long)]
    pub repo: String,
    #[arg(long)]
    pub branch: Option<String>,
    #[arg(long)]
    pub image_tag: Option<String>,
}

#[derive(Subcommand)]
pub enum SandboxCommand {
    /// Create a sandbox
    Create {
        #[arg(long)]
        project: String,
        #[command(flatten)]
        repo: RepoArgs,
    },
    /// List sandboxes
    List {
        #[arg(long)]
        project: Option<String>,
    },
    Get { id: String },
    Start { id: String },
    Stop { id: String },
    Terminate { id: String },
    /// Execute a command inside a sandbox
    Exec {
        id: String,
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Command and arguments
        #[arg(trailing_var_arg = true, required = true)]
        argv: Vec<String>,
    },
    /// Stream a service's log lines
    Logs { id: String, service: String },
    /// Git status of the checkout
    Git { id: String },
    /// Force a git sync
    Sync { id: String },
    /// Snapshot a sandbox for a session
    Snapshot {
        id: String,
        #[arg(long)]
        session: String,
        #[arg(long)]
        commit: String,
        #[arg(long)]
        dirty: bool,
    },
    /// Restore a session's current snapshot
    Restore {
        #[arg(long)]
        session: String,
    },
}

#[derive(Subcommand)]
pub enum SnapshotCommand {
    List,
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum PoolCommand {
    /// Claim a warm sandbox
    Claim {
        #[command(flatten)]
        repo: RepoArgs,
        #[arg(long)]
        project: String,
    },
    /// Signal typing activity (eager prewarm)
    Typing {
        #[command(flatten)]
        repo: RepoArgs,
        #[arg(long)]
        project: String,
    },
    /// Pool population
    Stats {
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        image_tag: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Spawn a background agent
    Spawn {
        #[arg(long)]
        session: String,
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        task: String,
    },
    Get { id: String },
    Output { id: String },
    Cancel { id: String },
    List,
    /// Stream status changes until the agent finishes
    Watch { id: String },
}

#[derive(Subcommand)]
pub enum SessionCommand {
    Create {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        work_session: Option<String>,
    },
    Get { session: String },
    List,
    Delete { session: String },
    Join {
        session: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: Option<String>,
    },
    Leave {
        session: String,
        #[arg(long)]
        user: String,
    },
    Connect {
        session: String,
        #[arg(long)]
        user: String,
        /// web | slack | chrome | mobile | voice
        #[arg(long, default_value = "web")]
        kind: String,
    },
    Disconnect {
        session: String,
        #[arg(long)]
        client: String,
    },
    Cursor {
        session: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        line: Option<u32>,
        #[arg(long)]
        column: Option<u32>,
    },
    Lock {
        session: String,
        #[arg(long)]
        user: String,
    },
    Unlock {
        session: String,
        #[arg(long)]
        user: String,
    },
    CanEdit {
        session: String,
        #[arg(long)]
        user: String,
    },
    /// Patch shared state
    State {
        session: String,
        /// pending | syncing | synced | error
        #[arg(long)]
        git_sync: Option<String>,
        /// idle | thinking | executing
        #[arg(long)]
        activity: Option<String>,
    },
    /// Signal working-tree changes from the tool layer
    HasChanges { session: String },
}

#[derive(Subcommand)]
pub enum PromptCommand {
    Add {
        session: String,
        #[arg(long)]
        user: String,
        /// urgent | high | normal
        #[arg(long, default_value = "normal")]
        priority: String,
        content: String,
    },
    /// Promote the head queued prompt
    Start { session: String },
    /// Complete the in-flight prompt
    Complete { session: String },
    Cancel {
        session: String,
        prompt: String,
        #[arg(long)]
        user: String,
    },
    Reorder {
        session: String,
        prompt: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        index: usize,
    },
    List { session: String },
}
