//! Queue state shared by the poller and the workers.

use std::sync::{Arc, Mutex, PoisonError};

use super::TaskStore;
use crate::domain::MentionId;

/// Highest mention id already ingested.
///
/// Monotonically non-decreasing: `advance` never moves it backwards.
#[derive(Debug, Clone, Default)]
pub struct Watermark {
    value: Arc<Mutex<Option<MentionId>>>,
}

impl Watermark {
    pub fn new(initial: Option<MentionId>) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn get(&self) -> Option<MentionId> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `candidate` if it is higher. Returns whether it moved.
    pub fn advance(&self, candidate: MentionId) -> bool {
        let mut value = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        match *value {
            Some(current) if current >= candidate => false,
            _ => {
                *value = Some(candidate);
                true
            }
        }
    }
}

/// Everything the two loops share: the pending tasks and the watermark.
///
/// Passed around explicitly so independent bot instances (and tests) never
/// see each other's state.
#[derive(Clone, Default)]
pub struct QueueState {
    pub tasks: TaskStore,
    pub watermark: Watermark,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::mention;

    #[test]
    fn watermark_only_moves_forward() {
        let mark = Watermark::default();
        assert_eq!(mark.get(), None);
        assert!(mark.advance(MentionId::new(10)));
        assert!(!mark.advance(MentionId::new(5)));
        assert!(!mark.advance(MentionId::new(10)));
        assert_eq!(mark.get(), Some(MentionId::new(10)));
        assert!(mark.advance(MentionId::new(11)));
        assert_eq!(mark.get(), Some(MentionId::new(11)));
    }

    #[test]
    fn separate_states_are_isolated() {
        let a = QueueState::new();
        let b = QueueState::new();
        a.tasks.upsert(mention(1, "x"));
        a.watermark.advance(MentionId::new(1));
        assert!(b.tasks.is_empty());
        assert_eq!(b.watermark.get(), None);

        let a_again = a.clone();
        assert_eq!(a_again.tasks.len(), 1);
    }
}
