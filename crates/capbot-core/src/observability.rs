use serde::{Deserialize, Serialize};

/// Point-in-time view of the pending queue, logged once per poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub leased: usize,
    /// Pending tasks with at least one failure.
    pub with_failures: usize,
    pub total_failures: usize,
}
