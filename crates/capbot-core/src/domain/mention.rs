//! Mention record: one pending reply task plus its failure history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::MentionId;
use super::post::Post;

/// One recorded unsuccessful attempt at processing a mention.
///
/// Append-only: once pushed onto a mention it is never mutated or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureEvent {
    /// 1-based retry ordinal.
    pub ordinal: u32,
    pub at: DateTime<Utc>,
    pub error: String,
}

impl FailureEvent {
    pub fn new(ordinal: u32, at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            ordinal,
            at,
            error: error.into(),
        }
    }
}

/// A pending mention-reply task.
///
/// Design:
/// - Created when the poller first observes the mention.
/// - Re-observation refreshes `post` only; `created_at` and `failures` survive.
/// - Owned by the TaskStore while pending; workers only ever see clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: MentionId,
    pub created_at: DateTime<Utc>,
    pub post: Post,
    pub failures: Vec<FailureEvent>,
}

impl Mention {
    /// Build a fresh task from an observed mention post.
    pub fn observe(post: Post) -> Self {
        Self {
            id: MentionId::new(post.id.get()),
            created_at: post.created_at,
            post,
            failures: Vec::new(),
        }
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Ordinal the next failure event should carry.
    pub fn next_ordinal(&self) -> u32 {
        self.failures.len() as u32 + 1
    }

    /// Screen name of whoever sent the mention.
    pub fn actor(&self) -> &str {
        &self.post.author.screen_name
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Merge a re-observation of the same mention into this record.
    pub fn merge_observation(&mut self, post: Post) {
        debug_assert_eq!(post.id.get(), self.id.get());
        self.post = post;
    }

    pub fn record_failure(&mut self, event: FailureEvent) {
        self.failures.push(event);
    }
}
