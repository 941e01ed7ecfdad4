// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Argument → protocol request translation.

use crate::args::{
    AgentCommand, PoolCommand, PromptCommand, RepoArgs, SandboxCommand, SessionCommand,
    SnapshotCommand,
};
use anyhow::{bail, Result};
use ens_core::{
    AgentActivity, AgentId, ClientKind, CreateSandboxInput, Cursor, ExecRequest, GitSyncStatus,
    PoolKey, Priority, SpawnAgentInput, StatePatch,
};
use ens_daemon::protocol::Request;

fn parse_priority(value: &str) -> Result<Priority> {
    Ok(match value {
        "urgent" => Priority::Urgent,
        "high" => Priority::High,
        "normal" => Priority::Normal,
        other => bail!("unknown priority: {other} (expected urgent|high|normal)"),
    })
}

fn parse_kind(value: &str) -> Result<ClientKind> {
    Ok(match value {
        "web" => ClientKind::Web,
        "slack" => ClientKind::Slack,
        "chrome" => ClientKind::Chrome,
        "mobile" => ClientKind::Mobile,
        "voice" => ClientKind::Voice,
        other => bail!("unknown client kind: {other}"),
    })
}

fn parse_git_sync(value: &str) -> Result<GitSyncStatus> {
    Ok(match value {
        "pending" => GitSyncStatus::Pending,
        "syncing" => GitSyncStatus::Syncing,
        "synced" => GitSyncStatus::Synced,
        "error" => GitSyncStatus::Error,
        other => bail!("unknown git sync status: {other}"),
    })
}

fn parse_activity(value: &str) -> Result<AgentActivity> {
    Ok(match value {
        "idle" => AgentActivity::Idle,
        "thinking" => AgentActivity::Thinking,
        "executing" => AgentActivity::Executing,
        other => bail!("unknown agent activity: {other}"),
    })
}

fn pool_key(repo: RepoArgs) -> PoolKey {
    PoolKey { repository: repo.repo, branch: repo.branch, image_tag: repo.image_tag }
}

pub enum SandboxAction {
    Call(Request),
    StreamLogs { id: ens_core::SandboxId, service: String },
}

pub fn sandbox_request(cmd: SandboxCommand) -> Result<SandboxAction> {
    let request = match cmd {
        SandboxCommand::Create { project, repo } => {
            let mut input = CreateSandboxInput::new(project, repo.repo);
            input.branch = repo.branch;
            input.image_tag = repo.image_tag;
            Request::SandboxCreate { input }
        }
        SandboxCommand::List { project } => Request::SandboxList { project_id: project },
        SandboxCommand::Get { id } => Request::SandboxGet { id: id.into() },
        SandboxCommand::Start { id } => Request::SandboxStart { id: id.into() },
        SandboxCommand::Stop { id } => Request::SandboxStop { id: id.into() },
        SandboxCommand::Terminate { id } => Request::SandboxTerminate { id: id.into() },
        SandboxCommand::Exec { id, timeout_ms, argv } => {
            let mut request = ExecRequest::new(argv);
            request.timeout_ms = timeout_ms;
            Request::SandboxExec { id: id.into(), request }
        }
        SandboxCommand::Logs { id, service } => {
            return Ok(SandboxAction::StreamLogs { id: id.into(), service })
        }
        SandboxCommand::Git { id } => Request::SandboxGit { id: id.into() },
        SandboxCommand::Sync { id } => Request::SandboxGitSync { id: id.into() },
        SandboxCommand::Snapshot { id, session, commit, dirty } => Request::SandboxSnapshot {
            id: id.into(),
            session_id: session.into(),
            git_commit: commit,
            has_uncommitted_changes: dirty,
        },
        SandboxCommand::Restore { session } => {
            Request::SandboxRestore { session_id: session.into() }
        }
    };
    Ok(SandboxAction::Call(request))
}

pub fn snapshot_request(cmd: SnapshotCommand) -> Request {
    match cmd {
        SnapshotCommand::List => Request::SnapshotList,
        SnapshotCommand::Delete { id } => Request::SnapshotDelete { id: id.into() },
    }
}

pub fn pool_request(cmd: PoolCommand) -> Request {
    match cmd {
        PoolCommand::Claim { repo, project } => {
            Request::PoolClaim { key: pool_key(repo), project_id: project }
        }
        PoolCommand::Typing { repo, project } => {
            Request::PoolTyping { key: pool_key(repo), project_id: project }
        }
        PoolCommand::Stats { repo, branch, image_tag } => Request::PoolStats {
            key: repo.map(|repository| PoolKey { repository, branch, image_tag }),
        },
    }
}

pub enum AgentAction {
    Call(Request),
    Watch { id: AgentId },
}

pub fn agent_request(cmd: AgentCommand) -> Result<AgentAction> {
    let request = match cmd {
        AgentCommand::Spawn { session, repo, branch, task } => {
            let mut input = SpawnAgentInput::new(session.into(), task);
            input.repository = repo;
            input.branch = branch;
            Request::AgentSpawn { input }
        }
        AgentCommand::Get { id } => Request::AgentGet { id: id.into() },
        AgentCommand::Output { id } => Request::AgentOutput { id: id.into() },
        AgentCommand::Cancel { id } => Request::AgentCancel { id: id.into() },
        AgentCommand::List => Request::AgentList,
        AgentCommand::Watch { id } => return Ok(AgentAction::Watch { id: id.into() }),
    };
    Ok(AgentAction::Call(request))
}

pub fn session_request(cmd: SessionCommand) -> Result<Request> {
    Ok(match cmd {
        SessionCommand::Create { id, work_session } => Request::SessionCreate {
            id: id.map(Into::into),
            work_session_id: work_session,
        },
        SessionCommand::Get { session } => Request::SessionGet { session_id: session.into() },
        SessionCommand::List => Request::SessionList,
        SessionCommand::Delete { session } => {
            Request::SessionDelete { session_id: session.into() }
        }
        SessionCommand::Join { session, user, name, email } => Request::Join {
            session_id: session.into(),
            user_id: user.into(),
            display_name: name,
            email,
            avatar: None,
        },
        SessionCommand::Leave { session, user } => {
            Request::Leave { session_id: session.into(), user_id: user.into() }
        }
        SessionCommand::Connect { session, user, kind } => Request::Connect {
            session_id: session.into(),
            user_id: user.into(),
            kind: parse_kind(&kind)?,
        },
        SessionCommand::Disconnect { session, client } => Request::Disconnect {
            session_id: session.into(),
            client_id: client.into(),
        },
        SessionCommand::Cursor { session, user, file, line, column } => Request::UpdateCursor {
            session_id: session.into(),
            user_id: user.into(),
            cursor: Some(Cursor { file, line, column }),
        },
        SessionCommand::Lock { session, user } => {
            Request::AcquireLock { session_id: session.into(), user_id: user.into() }
        }
        SessionCommand::Unlock { session, user } => {
            Request::ReleaseLock { session_id: session.into(), user_id: user.into() }
        }
        SessionCommand::CanEdit { session, user } => {
            Request::CanEdit { session_id: session.into(), user_id: user.into() }
        }
        SessionCommand::State { session, git_sync, activity } => {
            let patch = StatePatch {
                git_sync: git_sync.as_deref().map(parse_git_sync).transpose()?,
                agent_activity: activity.as_deref().map(parse_activity).transpose()?,
                edit_lock: None,
            };
            Request::UpdateState { session_id: session.into(), patch }
        }
        SessionCommand::HasChanges { session } => {
            Request::HasChanges { session_id: session.into() }
        }
    })
}

pub fn prompt_request(cmd: PromptCommand) -> Result<Request> {
    Ok(match cmd {
        PromptCommand::Add { session, user, priority, content } => Request::PromptAdd {
            session_id: session.into(),
            user_id: user.into(),
            content,
            priority: parse_priority(&priority)?,
        },
        PromptCommand::Start { session } => {
            Request::PromptStartNext { session_id: session.into() }
        }
        PromptCommand::Complete { session } => {
            Request::PromptComplete { session_id: session.into() }
        }
        PromptCommand::Cancel { session, prompt, user } => Request::PromptCancel {
            session_id: session.into(),
            prompt_id: prompt.into(),
            user_id: user.into(),
        },
        PromptCommand::Reorder { session, prompt, user, index } => Request::PromptReorder {
            session_id: session.into(),
            prompt_id: prompt.into(),
            user_id: user.into(),
            new_index: index,
        },
        PromptCommand::List { session } => Request::PromptList { session_id: session.into() },
    })
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
