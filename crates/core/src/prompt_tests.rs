// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::queued_prompt;
use crate::test_support::strategies::arb_prompt_status;
use proptest::prelude::*;
use yare::parameterized;

#[test]
fn priority_rank_order() {
    assert!(Priority::Urgent < Priority::High);
    assert!(Priority::High < Priority::Normal);
    assert_eq!(Priority::Urgent.rank(), 0);
    assert_eq!(Priority::High.rank(), 1);
    assert_eq!(Priority::Normal.rank(), 2);
}

#[parameterized(
    queued_to_executing = { PromptStatus::Queued, PromptStatus::Executing, true },
    executing_to_completed = { PromptStatus::Executing, PromptStatus::Completed, true },
    queued_to_cancelled = { PromptStatus::Queued, PromptStatus::Cancelled, true },
    queued_to_completed = { PromptStatus::Queued, PromptStatus::Completed, false },
    executing_to_cancelled = { PromptStatus::Executing, PromptStatus::Cancelled, false },
    completed_to_executing = { PromptStatus::Completed, PromptStatus::Executing, false },
    cancelled_to_queued = { PromptStatus::Cancelled, PromptStatus::Queued, false },
)]
fn transition_table(from: PromptStatus, to: PromptStatus, allowed: bool) {
    assert_eq!(from.can_transition(to), allowed);
}

#[test]
fn transition_stamps_timestamps() {
    let mut prompt = queued_prompt();
    assert!(prompt.transition(PromptStatus::Executing, 10));
    assert_eq!(prompt.started_at_ms, Some(10));

    assert!(prompt.transition(PromptStatus::Completed, 20));
    assert_eq!(prompt.completed_at_ms, Some(20));
}

#[test]
fn rejected_transition_leaves_prompt_untouched() {
    let mut prompt = queued_prompt();
    assert!(!prompt.transition(PromptStatus::Completed, 10));
    assert_eq!(prompt.status, PromptStatus::Queued);
    assert!(prompt.completed_at_ms.is_none());
}

#[test]
fn prompt_serde_round_trip() {
    let mut prompt = queued_prompt();
    prompt.priority = Priority::Urgent;
    let json = serde_json::to_string(&prompt).unwrap();
    let parsed: Prompt = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, prompt);
}

proptest! {
    /// Terminal prompt statuses are absorbing.
    #[test]
    fn terminal_statuses_absorb(from in arb_prompt_status(), to in arb_prompt_status()) {
        if from.is_terminal() {
            prop_assert!(!from.can_transition(to));
        }
    }
}
