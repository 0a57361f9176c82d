//! Domain model (IDs, posts, mentions, audit records).

pub mod ids;
pub mod mention;
pub mod outcome;
pub mod post;

pub use ids::{Id, IdMarker, LeaseToken, MentionId, PostId, UserId};
pub use mention::{FailureEvent, Mention};
pub use outcome::{AuditRecord, DiscardReason};
pub use post::{Author, BotIdentity, Media, MediaKind, Post};
