// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt queue operations on the session aggregate.
//!
//! The queue is a Vec kept in execution order. Buckets fall out of the
//! insertion rule: a new prompt lands after every prompt of equal or higher
//! priority, which is FIFO within a priority level. A heap would lose that
//! FIFO guarantee.
//!
//! The in-flight prompt lives in `session.active_prompt`, never in the
//! queue, so "at most one executing" holds structurally.

use crate::prompt::{Priority, Prompt, PromptId, PromptStatus};
use crate::session::Session;
use crate::user::UserId;
use thiserror::Error;

/// Errors from prompt queue operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("prompt queue is full")]
    Full,
    #[error("prompt not found: {0}")]
    NotFound(PromptId),
    #[error("prompt {0} does not belong to requesting user")]
    NotAuthorized(PromptId),
    #[error("prompt {0} is executing and cannot be modified")]
    NotQueued(PromptId),
    #[error("reordering is disabled for this session")]
    ReorderDisabled,
}

impl Session {
    /// Queue a prompt. The new prompt is inserted after all existing prompts
    /// of equal or higher priority; the in-flight prompt is unaffected.
    pub fn enqueue_prompt(
        &mut self,
        user_id: impl Into<UserId>,
        content: impl Into<String>,
        priority: Priority,
        now_ms: u64,
        max_prompts: usize,
    ) -> Result<Prompt, QueueError> {
        let pending = self.prompt_queue.len() + usize::from(self.active_prompt.is_some());
        if pending >= max_prompts {
            return Err(QueueError::Full);
        }
        let prompt = Prompt::new(self.id.clone(), user_id, content, priority, now_ms);
        let at = self
            .prompt_queue
            .iter()
            .rposition(|p| p.priority.rank() <= priority.rank())
            .map(|i| i + 1)
            .unwrap_or(0);
        self.prompt_queue.insert(at, prompt.clone());
        Ok(prompt)
    }

    /// Promote the head queued prompt to executing.
    ///
    /// Returns `None` when a prompt is already in flight (single-flight) or
    /// the queue is empty.
    pub fn start_next_prompt(&mut self, now_ms: u64) -> Option<Prompt> {
        if self.active_prompt.is_some() {
            return None;
        }
        if self.prompt_queue.is_empty() {
            return None;
        }
        let mut prompt = self.prompt_queue.remove(0);
        if !prompt.transition(PromptStatus::Executing, now_ms) {
            // A non-queued prompt in the queue would be an invariant breach;
            // drop it rather than execute it.
            return None;
        }
        self.active_prompt = Some(prompt.clone());
        Some(prompt)
    }

    /// Mark the in-flight prompt completed and remove it.
    pub fn complete_active_prompt(&mut self, now_ms: u64) -> Option<Prompt> {
        let mut prompt = self.active_prompt.take()?;
        prompt.transition(PromptStatus::Completed, now_ms);
        Some(prompt)
    }

    /// Cancel a queued prompt. Only the author may cancel, and only while
    /// the prompt is still queued; the in-flight prompt is not cancellable
    /// through the queue.
    pub fn cancel_prompt(
        &mut self,
        id: &PromptId,
        user_id: &UserId,
        now_ms: u64,
    ) -> Result<Prompt, QueueError> {
        if self.active_prompt.as_ref().is_some_and(|p| &p.id == id) {
            return Err(QueueError::NotQueued(id.clone()));
        }
        let pos = self
            .prompt_queue
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;
        if &self.prompt_queue[pos].user_id != user_id {
            return Err(QueueError::NotAuthorized(id.clone()));
        }
        let mut prompt = self.prompt_queue.remove(pos);
        prompt.transition(PromptStatus::Cancelled, now_ms);
        Ok(prompt)
    }

    /// Move a queued prompt to `new_index` within the queue (clamped).
    /// Only the author may reorder their own prompt.
    pub fn reorder_prompt(
        &mut self,
        id: &PromptId,
        user_id: &UserId,
        new_index: usize,
        allow_reorder: bool,
    ) -> Result<usize, QueueError> {
        if !allow_reorder {
            return Err(QueueError::ReorderDisabled);
        }
        if self.active_prompt.as_ref().is_some_and(|p| &p.id == id) {
            return Err(QueueError::NotQueued(id.clone()));
        }
        let pos = self
            .prompt_queue
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| QueueError::NotFound(id.clone()))?;
        if &self.prompt_queue[pos].user_id != user_id {
            return Err(QueueError::NotAuthorized(id.clone()));
        }
        let target = new_index.min(self.prompt_queue.len() - 1);
        let prompt = self.prompt_queue.remove(pos);
        self.prompt_queue.insert(target, prompt);
        Ok(target)
    }

    /// Cancel every queued prompt, returning them in former queue order.
    /// Used when a session is destroyed.
    pub fn clear_prompt_queue(&mut self, now_ms: u64) -> Vec<Prompt> {
        let mut cleared = std::mem::take(&mut self.prompt_queue);
        for prompt in &mut cleared {
            prompt.transition(PromptStatus::Cancelled, now_ms);
        }
        cleared
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
