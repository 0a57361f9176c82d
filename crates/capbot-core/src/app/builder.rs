//! BotBuilder - Bot の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: ループ開始前に設定と協力者の不足を検出
//! - 明確なエラーメッセージ

use std::sync::Arc;

use crate::app::archive::Archiver;
use crate::app::poller::Poller;
use crate::app::runtime::Bot;
use crate::app::worker_loop::{WorkerLoop, WorkerSettings};
use crate::config::BotConfig;
use crate::error::{CapbotError, ErrorKind};
use crate::impls::FileAuditLog;
use crate::pipeline::{MentionHandler, ReplyPipeline};
use crate::ports::{AuditSink, Captioner, Clock, MediaTransport, SocialClient, SystemClock};
use crate::queue::QueueState;

/// BotBuilder は Bot を構築
///
/// # 使用例
/// ```ignore
/// let bot = BotBuilder::new(config)
///     .social(client)
///     .transport(Arc::new(HttpTransport::new(timeout)?))
///     .captioner(Arc::new(CommandCaptioner::new(config.captioner.clone())))
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - build() 時に設定を検証（出力ディレクトリ、フォールバック画像、ワーカー数）
/// - 必須の協力者（SocialClient、MediaTransport、Captioner）が揃っているかチェック
/// - 不足があれば BuildError を返す
pub struct BotBuilder {
    config: BotConfig,
    social: Option<Arc<dyn SocialClient>>,
    transport: Option<Arc<dyn MediaTransport>>,
    captioner: Option<Arc<dyn Captioner>>,
    handler: Option<Arc<dyn MentionHandler>>,
    audit: Option<Arc<dyn AuditSink>>,
    clock: Arc<dyn Clock>,
}

/// BuildError は Bot 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing components: {0:?}. These must be set before build().")]
    MissingComponents(Vec<&'static str>),

    #[error(transparent)]
    Invalid(#[from] CapbotError),
}

impl BuildError {
    /// Every build failure stops the process before any loop starts.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Fatal
    }
}

impl BotBuilder {
    pub fn new(config: BotConfig) -> Self {
        Self {
            config,
            social: None,
            transport: None,
            captioner: None,
            handler: None,
            audit: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn social(mut self, social: Arc<dyn SocialClient>) -> Self {
        self.social = Some(social);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn MediaTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn captioner(mut self, captioner: Arc<dyn Captioner>) -> Self {
        self.captioner = Some(captioner);
        self
    }

    /// Replace the reply pipeline. Transport and captioner are then optional.
    pub fn handler(mut self, handler: Arc<dyn MentionHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Defaults to `FileAuditLog` under the output directory.
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<Bot, BuildError> {
        self.config.validate()?;

        let mut missing = Vec::new();
        if self.social.is_none() {
            missing.push("social client");
        }
        if self.handler.is_none() {
            if self.transport.is_none() {
                missing.push("media transport");
            }
            if self.captioner.is_none() {
                missing.push("captioner");
            }
        }
        let (Some(social), true) = (self.social.clone(), missing.is_empty()) else {
            return Err(BuildError::MissingComponents(missing));
        };

        let handler = match self.handler.clone() {
            Some(handler) => handler,
            None => Arc::new(self.pipeline(Arc::clone(&social))?) as Arc<dyn MentionHandler>,
        };
        let audit = self
            .audit
            .clone()
            .unwrap_or_else(|| Arc::new(FileAuditLog::in_dir(&self.config.output_dir)) as Arc<dyn AuditSink>);

        let identity = social.identity();
        let settings = WorkerSettings::from_config(&self.config, &identity);
        let state = QueueState::new();
        let poller = Poller::new(
            Arc::clone(&social),
            state.clone(),
            self.config.fetch_retry.clone(),
            self.config.mention_batch_size,
            self.config.poll_interval,
        );
        let workers = (0..self.config.worker_count)
            .map(|worker_id| {
                WorkerLoop::new(
                    worker_id,
                    state.tasks.clone(),
                    Arc::clone(&handler),
                    Arc::clone(&audit),
                    Arc::clone(&self.clock),
                    settings.clone(),
                )
            })
            .collect();

        tracing::info!(
            bot = %identity.screen_name,
            workers = self.config.worker_count,
            mode = ?self.config.ingest_mode,
            output_dir = %self.config.output_dir.display(),
            "bot built"
        );
        Ok(Bot::new(self.config, state, poller, workers))
    }

    /// Archive mode needs the pipeline but no queue or audit log.
    pub fn build_archiver(self) -> Result<Archiver, BuildError> {
        self.config.validate()?;
        let mut missing = Vec::new();
        if self.social.is_none() {
            missing.push("social client");
        }
        if self.transport.is_none() {
            missing.push("media transport");
        }
        if self.captioner.is_none() {
            missing.push("captioner");
        }
        let (Some(social), true) = (self.social.clone(), missing.is_empty()) else {
            return Err(BuildError::MissingComponents(missing));
        };
        let pipeline = Arc::new(self.pipeline(Arc::clone(&social))?);
        Ok(Archiver::new(social, pipeline, self.clock))
    }

    fn pipeline(&self, social: Arc<dyn SocialClient>) -> Result<ReplyPipeline, BuildError> {
        let (Some(transport), Some(captioner)) = (self.transport.clone(), self.captioner.clone())
        else {
            return Err(BuildError::MissingComponents(vec!["media transport", "captioner"]));
        };
        Ok(ReplyPipeline::new(
            social,
            transport,
            captioner,
            self.config.download_retry.clone(),
            self.config.output_dir.clone(),
            self.config.fallback_image.clone(),
            self.config.response_text.clone(),
        ))
    }
}
