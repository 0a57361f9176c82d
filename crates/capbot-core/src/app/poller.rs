//! Poller - メンションの取り込み
//!
//! # フロー（1 サイクル）
//! 1. watermark より新しいメンションを最大 `batch_size` 件取得（RetryPolicy で有限回リトライ）
//! 2. 各メンションを TaskStore に upsert（既存なら merge）
//! 3. すべての upsert 後に watermark をバッチ最大 ID へ進める
//!
//! 取得失敗はサイクル単位でスキップするだけで、ループは止まりません。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use crate::domain::{Mention, MentionId};
use crate::error::CapbotError;
use crate::ports::SocialClient;
use crate::queue::{QueueState, RetryPolicy, UpsertOutcome};

/// What one poll cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub fetched: usize,
    pub inserted: usize,
    pub merged: usize,
    /// Watermark after the cycle.
    pub watermark: Option<MentionId>,
}

pub struct Poller {
    social: Arc<dyn SocialClient>,
    state: QueueState,
    retry: RetryPolicy,
    batch_size: usize,
    interval: Duration,
}

impl Poller {
    pub fn new(
        social: Arc<dyn SocialClient>,
        state: QueueState,
        retry: RetryPolicy,
        batch_size: usize,
        interval: Duration,
    ) -> Self {
        Self {
            social,
            state,
            retry,
            batch_size: batch_size.max(1),
            interval,
        }
    }

    /// Seed the watermark with the newest existing mention so that backlog
    /// is never answered. Call before any loop starts; an error here means
    /// the bot cannot start.
    pub async fn prime(&self) -> Result<Option<MentionId>, CapbotError> {
        let newest = self
            .retry
            .run("prime watermark", || {
                self.social.fetch_mentions_since(1, None)
            })
            .await?;

        if let Some(post) = newest.iter().max_by_key(|p| p.id) {
            self.state.watermark.advance(MentionId::new(post.id.get()));
        }
        let watermark = self.state.watermark.get();
        tracing::info!(watermark = ?watermark, "watermark primed");
        Ok(watermark)
    }

    pub async fn poll_once(&self) -> Result<PollReport, CapbotError> {
        let since = self.state.watermark.get();
        let batch = self
            .retry
            .run("fetch mentions", || {
                self.social.fetch_mentions_since(self.batch_size, since)
            })
            .await?;

        let mut report = PollReport {
            fetched: batch.len(),
            ..PollReport::default()
        };
        let mut newest: Option<MentionId> = None;

        for post in batch {
            let mention = Mention::observe(post);
            if since.is_some_and(|w| mention.id <= w) {
                tracing::debug!(mention_id = %mention.id, "ignoring mention at or below watermark");
                continue;
            }
            newest = newest.max(Some(mention.id));
            match self.state.tasks.upsert(mention) {
                UpsertOutcome::Inserted => report.inserted += 1,
                UpsertOutcome::Merged => report.merged += 1,
            }
        }

        if let Some(newest) = newest {
            self.state.watermark.advance(newest);
        }
        report.watermark = self.state.watermark.get();

        if report.inserted > 0 {
            tracing::info!(
                inserted = report.inserted,
                merged = report.merged,
                watermark = ?report.watermark,
                "mentions ingested"
            );
        }
        Ok(report)
    }

    /// Poll until shutdown. Errors are logged and the cycle is skipped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(err) = self.poll_once().await {
                tracing::warn!(error = %err, "poll cycle skipped");
            }
            let stats = self.state.tasks.stats();
            tracing::debug!(
                pending = stats.pending,
                leased = stats.leased,
                with_failures = stats.with_failures,
                "queue stats"
            );

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            if let Err(err) = self.social.refresh_session().await {
                tracing::warn!(error = %err, "session refresh failed");
            }
        }
        tracing::info!("poller stopped");
    }
}
