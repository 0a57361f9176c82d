//! In-memory task store: pending mentions keyed by id.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use crate::domain::{FailureEvent, LeaseToken, Mention, MentionId};
use crate::observability::QueueStats;

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Already pending; post snapshot refreshed, history kept.
    Merged,
}

/// In-memory store state.
#[derive(Default)]
struct StoreState {
    /// Pending tasks (single source of truth). Ordered by id so that
    /// selection ties resolve to the lowest id.
    tasks: BTreeMap<MentionId, Mention>,

    /// Mentions currently held by a worker.
    leased: HashMap<MentionId, LeaseToken>,
}

impl StoreState {
    /// Fewest failures first, lowest id on ties; leased mentions are skipped.
    fn best_candidate(&self) -> Option<&Mention> {
        self.tasks
            .values()
            .filter(|m| !self.leased.contains_key(&m.id))
            .min_by_key(|m| m.failure_count())
    }
}

struct Shared {
    state: Mutex<StoreState>,
    notify: Notify,
}

impl Shared {
    // Every critical section is a plain map mutation, so a poisoned lock still
    // holds consistent data.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Concurrency-safe mapping of pending mention-reply tasks.
///
/// Design:
/// - One mutex guards every read and write.
/// - The lock is held only for in-memory mutation; callers do I/O outside.
/// - Cloning the store clones the handle, not the data.
#[derive(Clone)]
pub struct TaskStore {
    shared: Arc<Shared>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(StoreState::default()),
                notify: Notify::new(),
            }),
        }
    }

    /// Insert a newly observed mention, or merge it into the pending record.
    ///
    /// A merge refreshes the post snapshot and never touches `created_at` or
    /// the failure history.
    pub fn upsert(&self, mention: Mention) -> UpsertOutcome {
        let outcome = {
            let mut state = self.shared.lock();
            match state.tasks.get_mut(&mention.id) {
                Some(existing) => {
                    existing.merge_observation(mention.post);
                    UpsertOutcome::Merged
                }
                None => {
                    state.tasks.insert(mention.id, mention);
                    UpsertOutcome::Inserted
                }
            }
        };
        if outcome == UpsertOutcome::Inserted {
            self.shared.notify.notify_one();
        }
        outcome
    }

    /// Snapshot of the best eligible pending task.
    pub fn select_next(&self) -> Option<Mention> {
        self.shared.lock().best_candidate().cloned()
    }

    /// Select the best eligible task and hold it exclusively until the lease
    /// is dropped.
    pub fn lease_next(&self) -> Option<MentionLease> {
        let mut state = self.shared.lock();
        let mention = state.best_candidate().cloned()?;
        let token = LeaseToken::generate();
        state.leased.insert(mention.id, token);
        Some(MentionLease {
            shared: Arc::clone(&self.shared),
            token,
            mention,
        })
    }

    /// Append to the named task's history. Returns false if it is gone.
    pub fn append_failure(&self, id: MentionId, event: FailureEvent) -> bool {
        let mut state = self.shared.lock();
        match state.tasks.get_mut(&id) {
            Some(mention) => {
                mention.record_failure(event);
                true
            }
            None => false,
        }
    }

    /// Delete the entry. Returns whether it was present.
    pub fn remove(&self, id: MentionId) -> bool {
        self.shared.lock().tasks.remove(&id).is_some()
    }

    pub fn get(&self, id: MentionId) -> Option<Mention> {
        self.shared.lock().tasks.get(&id).cloned()
    }

    pub fn contains(&self, id: MentionId) -> bool {
        self.shared.lock().tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().tasks.is_empty()
    }

    /// Pending ids in ascending order.
    pub fn ids(&self) -> Vec<MentionId> {
        self.shared.lock().tasks.keys().copied().collect()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.shared.lock();
        let mut stats = QueueStats {
            pending: state.tasks.len(),
            leased: state.leased.len(),
            ..QueueStats::default()
        };
        for mention in state.tasks.values() {
            if mention.failure_count() > 0 {
                stats.with_failures += 1;
                stats.total_failures += mention.failure_count();
            }
        }
        stats
    }

    /// Wait until a new mention is inserted or `timeout` elapses.
    pub async fn wait_for_work(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.shared.notify.notified()).await;
    }
}

/// Exclusive hold on one pending mention.
///
/// While the lease lives no other `lease_next` call returns this mention.
/// Dropping the lease releases it; the task itself stays pending unless the
/// holder removed it.
pub struct MentionLease {
    shared: Arc<Shared>,
    token: LeaseToken,
    mention: Mention,
}

impl MentionLease {
    /// Snapshot taken when the lease was granted.
    pub fn mention(&self) -> &Mention {
        &self.mention
    }

    pub fn token(&self) -> LeaseToken {
        self.token
    }
}

impl Drop for MentionLease {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if state.leased.get(&self.mention.id) == Some(&self.token) {
            state.leased.remove(&self.mention.id);
        }
    }
}
