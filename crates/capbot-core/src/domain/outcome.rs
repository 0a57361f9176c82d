//! Audit records: terminal outcomes of mention tasks.
//!
//! This module only defines the "shape" of what gets recorded; writing the
//! records is the job of an `AuditSink`.

use chrono::{DateTime, Utc};

use super::ids::{MentionId, PostId, UserId};
use super::mention::{FailureEvent, Mention};

/// Why a task ended up in the failed log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// Task aged past the reply window.
    Timeout,
}

impl DiscardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardReason::Timeout => "timeout",
        }
    }
}

/// An immutable terminal-outcome record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditRecord {
    Completed {
        at: DateTime<Utc>,
        handle: String,
        author_id: UserId,
        mention_id: MentionId,
        reply_id: PostId,
    },
    Failed {
        at: DateTime<Utc>,
        handle: String,
        mention_id: MentionId,
        reason: DiscardReason,
        failures: Vec<FailureEvent>,
    },
}

impl AuditRecord {
    pub fn completed(at: DateTime<Utc>, mention: &Mention, reply_id: PostId) -> Self {
        AuditRecord::Completed {
            at,
            handle: mention.actor().to_string(),
            author_id: mention.post.author.id,
            mention_id: mention.id,
            reply_id,
        }
    }

    pub fn evicted(at: DateTime<Utc>, mention: &Mention) -> Self {
        AuditRecord::Failed {
            at,
            handle: mention.actor().to_string(),
            mention_id: mention.id,
            reason: DiscardReason::Timeout,
            failures: mention.failures.clone(),
        }
    }

    pub fn mention_id(&self) -> MentionId {
        match self {
            AuditRecord::Completed { mention_id, .. } | AuditRecord::Failed { mention_id, .. } => {
                *mention_id
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, AuditRecord::Completed { .. })
    }

    /// Render as one self-contained comma-delimited line (no trailing newline).
    ///
    /// Completed: `ts,handle,author_id,mention_id,reply_id`
    /// Failed:    `ts,handle,mention_id,reason,history`
    pub fn to_line(&self) -> String {
        match self {
            AuditRecord::Completed {
                at,
                handle,
                author_id,
                mention_id,
                reply_id,
            } => [
                at.to_rfc3339(),
                field(handle),
                author_id.to_string(),
                mention_id.to_string(),
                reply_id.to_string(),
            ]
            .join(","),
            AuditRecord::Failed {
                at,
                handle,
                mention_id,
                reason,
                failures,
            } => [
                at.to_rfc3339(),
                field(handle),
                mention_id.to_string(),
                reason.as_str().to_string(),
                history(failures),
            ]
            .join(","),
        }
    }
}

/// Failure history as `#n@ts: error` entries joined by ` | `.
fn history(failures: &[FailureEvent]) -> String {
    failures
        .iter()
        .map(|f| format!("#{}@{}: {}", f.ordinal, f.at.to_rfc3339(), field(&f.error)))
        .collect::<Vec<_>>()
        .join(" | ")
}

// commas and line breaks would split the record
fn field(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            ',' => ';',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at_minutes, post};

    #[test]
    fn completed_line_has_five_fields() {
        let m = Mention::observe(post(77, "frank", "@bot please"));
        let line = AuditRecord::completed(at_minutes(3), &m, PostId::new(900)).to_line();
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[1], "frank");
        assert_eq!(fields[3], "77");
        assert_eq!(fields[4], "900");
    }

    #[test]
    fn failed_line_carries_sanitized_history() {
        let mut m = Mention::observe(post(78, "gina", "@bot"));
        m.record_failure(FailureEvent::new(1, at_minutes(1), "api: 503, try later"));
        m.record_failure(FailureEvent::new(2, at_minutes(2), "caption\ncrashed"));

        let line = AuditRecord::evicted(at_minutes(21), &m).to_line();
        assert!(!line.contains('\n'));
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[2], "78");
        assert_eq!(fields[3], "timeout");
        assert!(fields[4].starts_with("#1@"));
        assert!(fields[4].contains("api: 503; try later"));
        assert!(fields[4].contains(" | #2@"));
        assert!(fields[4].contains("caption crashed"));
    }

    #[test]
    fn eviction_without_failures_has_empty_history() {
        let m = Mention::observe(post(79, "hank", "@bot"));
        let record = AuditRecord::evicted(at_minutes(25), &m);
        assert!(!record.is_completed());
        assert!(record.to_line().ends_with(",timeout,"));
    }
}
