// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::prompt::{PromptId, Priority};
use crate::session::{AgentActivity, GitSyncStatus, SessionId};

#[test]
fn events_serialize_with_domain_tags() {
    let event = Event::SessionCreated { session_id: SessionId::from_string("ses_1") };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "session:created");
    assert_eq!(json["session_id"], "ses_1");
}

#[test]
fn state_changed_round_trips() {
    let event = Event::StateChanged {
        session_id: SessionId::from_string("ses_1"),
        git_sync: GitSyncStatus::Synced,
        agent_activity: AgentActivity::Executing,
        version: 7,
    };
    let json = serde_json::to_string(&event).unwrap();
    let parsed: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, event);
}

#[test]
fn prompt_added_round_trips() {
    let event = Event::PromptAdded {
        session_id: SessionId::from_string("ses_1"),
        prompt_id: PromptId::from_string("prm_9"),
        user_id: "u1".into(),
        priority: Priority::Urgent,
    };
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"prompt:added\""));
    assert!(json.contains("\"priority\":\"urgent\""));
    let parsed: Event = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, event);
}

#[test]
fn unknown_type_tags_deserialize_to_custom() {
    let parsed: Event =
        serde_json::from_str(r#"{"type":"timewarp:engaged","flux":9000}"#).unwrap();
    assert_eq!(parsed, Event::Custom);
}

#[test]
fn session_id_accessor_routes_session_events() {
    let sid = SessionId::from_string("ses_route");
    let event = Event::LockAcquired { session_id: sid.clone(), user_id: "u1".into() };
    assert_eq!(event.session_id(), Some(&sid));
    assert_eq!(Event::Shutdown.session_id(), None);
}

#[test]
fn log_summary_is_single_line() {
    let event = Event::GitSyncBlocked {
        session_id: SessionId::from_string("ses_1"),
        tool: "edit".to_string(),
    };
    let summary = event.log_summary();
    assert!(summary.contains("gitsync:blocked"));
    assert!(!summary.contains('\n'));
}
