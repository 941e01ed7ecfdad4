// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session prompt queue service.
//!
//! The queue state machine itself is pure (core's queue ops on the
//! aggregate); this service runs those ops through the per-session actor
//! and emits the `prompt:*` events.

use crate::actor::SessionActors;
use crate::error::EngineError;
use ens_core::{Clock, Event, Priority, Prompt, PromptId, SessionId, UserId};
use std::sync::Arc;

/// Prompt queue tunables.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_prompts: usize,
    pub allow_reorder: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_prompts: 50, allow_reorder: true }
    }
}

/// Priority-ordered, single-flight prompt queues, one per session.
pub struct PromptQueues<C: Clock> {
    actors: Arc<SessionActors<C>>,
    clock: C,
    config: QueueConfig,
}

impl<C: Clock> PromptQueues<C> {
    pub fn new(actors: Arc<SessionActors<C>>, clock: C, config: QueueConfig) -> Arc<Self> {
        Arc::new(Self { actors, clock, config })
    }

    /// Queue a prompt for the session agent.
    pub async fn add(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        content: impl Into<String>,
        priority: Priority,
    ) -> Result<Prompt, EngineError> {
        let now_ms = self.clock.epoch_ms();
        let max_prompts = self.config.max_prompts;
        let user_id = user_id.clone();
        let content = content.into();
        self.actors
            .update(session_id, move |session| {
                let prompt =
                    session.enqueue_prompt(user_id.clone(), content, priority, now_ms, max_prompts)?;
                let event = Event::PromptAdded {
                    session_id: session.id.clone(),
                    prompt_id: prompt.id.clone(),
                    user_id,
                    priority,
                };
                Ok((prompt, vec![event]))
            })
            .await
    }

    /// Promote the head queued prompt to executing. `None` when a prompt
    /// is already in flight or nothing is queued.
    pub async fn start_next(&self, session_id: &SessionId) -> Result<Option<Prompt>, EngineError> {
        let now_ms = self.clock.epoch_ms();
        self.actors
            .update(session_id, move |session| {
                match session.start_next_prompt(now_ms) {
                    Some(prompt) => {
                        let event = Event::PromptStarted {
                            session_id: session.id.clone(),
                            prompt_id: prompt.id.clone(),
                        };
                        Ok((Some(prompt), vec![event]))
                    }
                    None => Ok((None, vec![])),
                }
            })
            .await
    }

    /// Mark the in-flight prompt completed.
    pub async fn complete(&self, session_id: &SessionId) -> Result<Option<Prompt>, EngineError> {
        let now_ms = self.clock.epoch_ms();
        self.actors
            .update(session_id, move |session| {
                match session.complete_active_prompt(now_ms) {
                    Some(prompt) => {
                        let event = Event::PromptCompleted {
                            session_id: session.id.clone(),
                            prompt_id: prompt.id.clone(),
                        };
                        Ok((Some(prompt), vec![event]))
                    }
                    None => Ok((None, vec![])),
                }
            })
            .await
    }

    /// Cancel a queued prompt. Only the author may cancel; returns false
    /// when the prompt is unknown, already gone, executing, or not theirs.
    pub async fn cancel(
        &self,
        session_id: &SessionId,
        prompt_id: &PromptId,
        user_id: &UserId,
    ) -> Result<bool, EngineError> {
        let now_ms = self.clock.epoch_ms();
        let prompt_id = prompt_id.clone();
        let user_id = user_id.clone();
        self.actors
            .update(session_id, move |session| {
                match session.cancel_prompt(&prompt_id, &user_id, now_ms) {
                    Ok(prompt) => {
                        let event = Event::PromptCancelled {
                            session_id: session.id.clone(),
                            prompt_id: prompt.id,
                        };
                        Ok((true, vec![event]))
                    }
                    Err(_) => Ok((false, vec![])),
                }
            })
            .await
    }

    /// Move a queued prompt to a new index (author only, clamped).
    pub async fn reorder(
        &self,
        session_id: &SessionId,
        prompt_id: &PromptId,
        user_id: &UserId,
        new_index: usize,
    ) -> Result<usize, EngineError> {
        let allow = self.config.allow_reorder;
        let prompt_id = prompt_id.clone();
        let user_id = user_id.clone();
        self.actors
            .update(session_id, move |session| {
                let index = session.reorder_prompt(&prompt_id, &user_id, new_index, allow)?;
                let event = Event::PromptReordered {
                    session_id: session.id.clone(),
                    prompt_id,
                    index,
                };
                Ok((index, vec![event]))
            })
            .await
    }

    /// Cancel everything queued. Returns how many prompts were dropped.
    pub async fn clear(&self, session_id: &SessionId) -> Result<usize, EngineError> {
        let now_ms = self.clock.epoch_ms();
        self.actors
            .update(session_id, move |session| {
                let cleared = session.clear_prompt_queue(now_ms);
                if cleared.is_empty() {
                    return Ok((0, vec![]));
                }
                let event = Event::PromptQueueCleared {
                    session_id: session.id.clone(),
                    count: cleared.len(),
                };
                Ok((cleared.len(), vec![event]))
            })
            .await
    }

    /// Snapshot of the in-flight prompt and the queue, in execution order.
    pub async fn list(
        &self,
        session_id: &SessionId,
    ) -> Result<(Option<Prompt>, Vec<Prompt>), EngineError> {
        let session = self.actors.read(session_id).await?;
        Ok((session.active_prompt, session.prompt_queue))
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
