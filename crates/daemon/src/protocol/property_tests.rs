// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Round-trip properties for the wire protocol.

use super::*;
use ens_core::{CreateSandboxInput, Priority, SessionId, SpawnAgentInput};
use proptest::prelude::*;

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Urgent), Just(Priority::High), Just(Priority::Normal)]
}

fn arb_id() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,20}"
}

proptest! {
    #[test]
    fn prompt_add_round_trips(
        session in arb_id(),
        user in arb_id(),
        content in ".{0,200}",
        priority in arb_priority(),
    ) {
        let request = Request::PromptAdd {
            session_id: SessionId::from_string(&session),
            user_id: user.as_str().into(),
            content,
            priority,
        };
        let frame = encode(&request).unwrap();
        let parsed: Request = decode(&frame[4..]).unwrap();
        prop_assert_eq!(parsed, request);
    }

    #[test]
    fn sandbox_create_round_trips(
        project in arb_id(),
        repository in "[a-z]{1,10}/[a-z]{1,10}",
        branch in proptest::option::of("[a-z]{1,10}"),
    ) {
        let mut input = CreateSandboxInput::new(project, repository);
        input.branch = branch;
        let request = Request::SandboxCreate { input };
        let frame = encode(&request).unwrap();
        let parsed: Request = decode(&frame[4..]).unwrap();
        prop_assert_eq!(parsed, request);
    }

    #[test]
    fn agent_spawn_round_trips(session in arb_id(), task in ".{1,100}") {
        let request = Request::AgentSpawn {
            input: SpawnAgentInput::new(SessionId::from_string(&session), task),
        };
        let frame = encode(&request).unwrap();
        let parsed: Request = decode(&frame[4..]).unwrap();
        prop_assert_eq!(parsed, request);
    }

    #[test]
    fn error_responses_round_trip(message in ".{0,100}") {
        let response = Response::Error { kind: ErrorKind::ResourceExhausted, message };
        let frame = encode(&response).unwrap();
        let parsed: Response = decode(&frame[4..]).unwrap();
        prop_assert_eq!(parsed, response);
    }
}
