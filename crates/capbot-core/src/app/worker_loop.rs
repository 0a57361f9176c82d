//! WorkerLoop - 保留メンションの処理ループ
//!
//! # フロー（1 tick）
//! 1. TaskStore::lease_next() で最良の候補を排他的に取得（失敗回数が少ない順、同数なら ID 昇順）
//! 2. 返信期限（reply_window）を過ぎていれば failed 監査を書いて退去
//! 3. 自己返信なら黙って削除（監査なし、失敗カウントなし）
//! 4. MentionHandler 実行
//!    - 成功: 削除 + completed 監査
//!    - 失敗: FailureEvent を追記（タスクは保留のまま、次の選択で再挑戦）
//!
//! # 設計原則
//! - ストアのロックは in-memory の変更中だけ保持（I/O はロック外）
//! - lease により同じメンションを 2 つのワーカーが同時に処理しない
//! - 監査ログの書き込み失敗はログに残すだけでループは止めない

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::config::BotConfig;
use crate::domain::{AuditRecord, BotIdentity, FailureEvent, MentionId, Post, PostId, UserId};
use crate::pipeline::MentionHandler;
use crate::ports::{AuditSink, Clock};
use crate::queue::TaskStore;

/// Recognizes mentions the bot produced itself.
#[derive(Debug, Clone)]
pub struct SelfReplyFilter {
    markers: Vec<String>,
    bot_id: UserId,
    bot_name: String,
}

impl SelfReplyFilter {
    /// Posts authored by the bot account match outright. Otherwise
    /// `response_text` and every marker are matched against the mention
    /// text, and the bot's display name against the post source.
    pub fn new(response_text: &str, markers: &[String], identity: &BotIdentity) -> Self {
        let mut all = Vec::with_capacity(markers.len() + 1);
        all.push(response_text.to_string());
        all.extend(markers.iter().cloned());
        all.retain(|m| !m.is_empty());
        Self {
            markers: all,
            bot_id: identity.user_id,
            bot_name: identity.display_name.clone(),
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        if post.author.id == self.bot_id {
            return true;
        }
        if self.markers.iter().any(|m| post.text.contains(m.as_str())) {
            return true;
        }
        !self.bot_name.is_empty() && post.source.contains(self.bot_name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub reply_window: Duration,
    /// Pause when nothing is eligible, and after a failed attempt.
    ///
    /// The post-failure pause keeps a lone failing mention from being
    /// retried in a tight loop against the API. It also delays the other
    /// pending mentions of this worker by the same amount; retry spacing
    /// itself comes from selection order, not from this pause.
    pub idle_interval: Duration,
    pub self_filter: SelfReplyFilter,
}

impl WorkerSettings {
    pub fn from_config(config: &BotConfig, identity: &BotIdentity) -> Self {
        Self {
            reply_window: config.reply_window,
            idle_interval: config.idle_interval,
            self_filter: SelfReplyFilter::new(
                &config.response_text,
                &config.self_reference_markers,
                identity,
            ),
        }
    }
}

/// Outcome of one selection cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Nothing pending (or everything is leased by other workers).
    Idle,
    /// Past the reply window; recorded as failed and removed.
    Evicted(MentionId),
    /// Self-reply; removed without a trace.
    Discarded(MentionId),
    Completed { mention: MentionId, reply: PostId },
    /// Handler error; appended to the task's history.
    Failed { mention: MentionId, error: String },
}

pub struct WorkerLoop {
    worker_id: usize,
    store: TaskStore,
    handler: Arc<dyn MentionHandler>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    settings: WorkerSettings,
}

impl WorkerLoop {
    pub fn new(
        worker_id: usize,
        store: TaskStore,
        handler: Arc<dyn MentionHandler>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            worker_id,
            store,
            handler,
            audit,
            clock,
            settings,
        }
    }

    pub async fn tick(&self) -> Tick {
        let Some(lease) = self.store.lease_next() else {
            return Tick::Idle;
        };
        let mention = lease.mention().clone();
        let id = mention.id;
        let now = self.clock.now();
        tracing::debug!(
            worker = self.worker_id,
            mention_id = %id,
            lease = %lease.token(),
            "mention leased"
        );

        let expired = mention
            .age(now)
            .to_std()
            .is_ok_and(|age| age > self.settings.reply_window);
        if expired {
            let latest = self.store.get(id).unwrap_or(mention);
            if self.store.remove(id) {
                tracing::warn!(
                    worker = self.worker_id,
                    mention_id = %id,
                    failures = latest.failure_count(),
                    "reply window passed, mention evicted"
                );
                self.write_audit(AuditRecord::evicted(now, &latest)).await;
            }
            return Tick::Evicted(id);
        }

        if self.settings.self_filter.matches(&mention.post) {
            self.store.remove(id);
            tracing::info!(worker = self.worker_id, mention_id = %id, "self-reply skipped");
            return Tick::Discarded(id);
        }

        match self.handler.handle(&mention).await {
            Ok(reply) => {
                self.store.remove(id);
                drop(lease);
                self.write_audit(AuditRecord::completed(self.clock.now(), &mention, reply))
                    .await;
                Tick::Completed { mention: id, reply }
            }
            Err(err) => {
                let event = FailureEvent::new(mention.next_ordinal(), self.clock.now(), err.to_string());
                tracing::warn!(
                    worker = self.worker_id,
                    mention_id = %id,
                    failure = event.ordinal,
                    kind = ?err.kind(),
                    error = %err,
                    "reply attempt failed"
                );
                self.store.append_failure(id, event);
                Tick::Failed {
                    mention: id,
                    error: err.to_string(),
                }
            }
        }
    }

    /// Tick until shutdown.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        self.run_inner(shutdown, false).await;
    }

    /// Tick until the store is empty or shutdown is requested.
    pub async fn drain(&self, shutdown: watch::Receiver<bool>) {
        self.run_inner(shutdown, true).await;
    }

    async fn run_inner(&self, mut shutdown: watch::Receiver<bool>, until_empty: bool) {
        tracing::info!(worker = self.worker_id, "worker started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            if until_empty && self.store.is_empty() {
                break;
            }

            let idle = self.settings.idle_interval;
            match self.tick().await {
                Tick::Idle => {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = self.store.wait_for_work(idle) => {}
                    }
                }
                Tick::Failed { .. } => {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(idle) => {}
                    }
                }
                _ => {}
            }
        }
        tracing::info!(worker = self.worker_id, "worker stopped");
    }

    async fn write_audit(&self, record: AuditRecord) {
        let mention_id = record.mention_id();
        if let Err(err) = self.audit.record(record).await {
            tracing::error!(worker = self.worker_id, %mention_id, error = %err, "audit write failed");
        }
    }
}
