//! Bot - Poller と WorkerLoop 群の起動と停止
//!
//! # 動作モード
//! - **Continuous**: watermark を初期化し、Poller と N 個の WorkerLoop を停止要求まで動かす
//! - **Batch**: 1 回だけ取り込み、ストアが空になるまでワーカーで処理して終了
//!
//! 停止は `watch` チャネル経由。処理中のメンションは最後まで実行され、新しい lease は取らない。

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::app::poller::{PollReport, Poller};
use crate::app::worker_loop::WorkerLoop;
use crate::config::{BotConfig, IngestMode};
use crate::error::CapbotError;
use crate::observability::QueueStats;
use crate::queue::QueueState;

pub struct Bot {
    config: BotConfig,
    state: QueueState,
    poller: Arc<Poller>,
    workers: Vec<Arc<WorkerLoop>>,
}

/// Result of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub poll: PollReport,
    /// Queue left behind (only non-empty if the run was cut short).
    pub remaining: QueueStats,
}

impl Bot {
    pub(crate) fn new(
        config: BotConfig,
        state: QueueState,
        poller: Poller,
        workers: Vec<WorkerLoop>,
    ) -> Self {
        Self {
            config,
            state,
            poller: Arc::new(poller),
            workers: workers.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Prime the watermark (when configured) and start the poller and all
    /// workers. A priming failure is returned before anything is spawned.
    pub async fn spawn(self) -> Result<BotHandle, CapbotError> {
        if self.config.skip_backlog {
            self.poller.prime().await?;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut joins = Vec::with_capacity(self.workers.len() + 1);

        let poller = Arc::clone(&self.poller);
        let rx = shutdown_rx.clone();
        joins.push(tokio::spawn(async move { poller.run(rx).await }));

        for worker in &self.workers {
            let worker = Arc::clone(worker);
            let rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move { worker.run(rx).await }));
        }

        tracing::info!(workers = self.workers.len(), "bot started");
        Ok(BotHandle {
            shutdown_tx,
            joins,
            state: self.state,
        })
    }

    /// One poll cycle, then work the queue until it is empty.
    ///
    /// Tasks leave the queue only by success, the self-reply filter or
    /// eviction, so a mention that keeps failing is retried until its reply
    /// window closes.
    pub async fn run_batch(self) -> Result<BatchReport, CapbotError> {
        let (_keep_open, shutdown) = watch::channel(false);
        self.run_batch_until(shutdown).await
    }

    pub async fn run_batch_until(
        self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<BatchReport, CapbotError> {
        let poll = self.poller.poll_once().await?;
        tracing::info!(inserted = poll.inserted, "batch ingested");

        let mut joins = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let worker = Arc::clone(worker);
            let rx = shutdown.clone();
            joins.push(tokio::spawn(async move { worker.drain(rx).await }));
        }
        join_all(joins).await;

        let remaining = self.state.tasks.stats();
        tracing::info!(pending = remaining.pending, "batch finished");
        Ok(BatchReport { poll, remaining })
    }

    /// Run in the configured ingest mode until `shutdown` flips to true
    /// (continuous) or the queue drains (batch). Only batch mode has a
    /// report to return.
    pub async fn run(
        self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Option<BatchReport>, CapbotError> {
        match self.config.ingest_mode {
            IngestMode::Batch => self.run_batch_until(shutdown).await.map(Some),
            IngestMode::Continuous => {
                let handle = self.spawn().await?;
                while !*shutdown.borrow() {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                }
                handle.shutdown_and_join().await;
                Ok(None)
            }
        }
    }
}

/// Running bot.
/// - `request_shutdown` で全ループに停止を通知
/// - `shutdown_and_join` で全タスクの終了を待つ
pub struct BotHandle {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    state: QueueState,
}

impl BotHandle {
    pub fn state(&self) -> &QueueState {
        &self.state
    }

    /// In-flight replies finish; no new lease is taken.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        join_all(self.joins).await;
        tracing::info!("bot stopped");
    }
}

async fn join_all(joins: Vec<JoinHandle<()>>) {
    for join in joins {
        if let Err(err) = join.await {
            tracing::error!(error = %err, "bot task panicked");
        }
    }
}
