//! Queue module: the pending-mention store, the ingest watermark, and the
//! retry policy used around external calls.

mod memory;
mod retry;
mod state;

pub use memory::{MentionLease, TaskStore, UpsertOutcome};
pub use retry::RetryPolicy;
pub use state::{QueueState, Watermark};
