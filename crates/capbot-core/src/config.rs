//! Bot configuration
//!
//! JSON ファイルから読み込みます。すべてのフィールドにデフォルト値があるため、
//! 空のオブジェクト `{}` でも有効な設定になります。
//! Duration は整数の秒数として表現します。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::BotIdentity;
use crate::error::CapbotError;
use crate::queue::RetryPolicy;

/// How mentions are ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Poll forever; workers run until shutdown.
    #[default]
    Continuous,
    /// One poll cycle, then drain the queue and stop.
    Batch,
}

/// External captioning program.
///
/// Invoked as `program [args...] <source> <dest> <line>...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionerConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_caption_timeout", with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for CaptionerConfig {
    fn default() -> Self {
        Self {
            program: "caption-render".to_string(),
            args: Vec::new(),
            timeout: default_caption_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Root for captioned media, redirect pages, audit logs and the log file.
    pub output_dir: PathBuf,

    /// Image captioned for posts without media.
    pub fallback_image: PathBuf,

    /// Appended to `@author` in every reply.
    pub response_text: String,

    /// Texts that mark a mention as the bot talking to itself.
    pub self_reference_markers: Vec<String>,

    /// Pending mentions older than this are evicted.
    #[serde(with = "duration_secs")]
    pub reply_window: Duration,

    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,

    /// Worker pause when the queue is empty or right after a failure.
    #[serde(with = "duration_secs")]
    pub idle_interval: Duration,

    pub mention_batch_size: usize,

    /// Seed the watermark from the newest mention at start-up so backlog is
    /// not answered.
    pub skip_backlog: bool,

    pub worker_count: usize,

    pub ingest_mode: IngestMode,

    pub fetch_retry: RetryPolicy,

    pub download_retry: RetryPolicy,

    pub captioner: CaptionerConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("tweet_caption_bot"),
            fallback_image: PathBuf::from("tweet_caption_bot/fallback.png"),
            response_text: "Your captioned tweet is ready!".to_string(),
            self_reference_markers: vec!["foo(goo())".to_string()],
            reply_window: Duration::from_secs(20 * 60),
            poll_interval: Duration::from_secs(12),
            idle_interval: Duration::from_secs(1),
            mention_batch_size: 200,
            skip_backlog: true,
            worker_count: 1,
            ingest_mode: IngestMode::Continuous,
            fetch_retry: RetryPolicy::backoff(10),
            download_retry: RetryPolicy::backoff(6),
            captioner: CaptionerConfig::default(),
        }
    }
}

impl BotConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CapbotError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CapbotError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| CapbotError::Config(format!("cannot parse config {}: {e}", path.display())))
    }

    pub fn completed_log_path(&self) -> PathBuf {
        self.output_dir.join("completed.tasks")
    }

    pub fn failed_log_path(&self) -> PathBuf {
        self.output_dir.join("failed.tasks")
    }

    /// Start-up checks. Any error here is fatal.
    pub fn validate(&self) -> Result<(), CapbotError> {
        if !self.output_dir.is_dir() {
            return Err(CapbotError::Config(format!(
                "{} is not a valid directory",
                self.output_dir.display()
            )));
        }
        if !self.fallback_image.is_file() {
            return Err(CapbotError::Config(format!(
                "fallback image {} does not exist",
                self.fallback_image.display()
            )));
        }
        if self.worker_count == 0 {
            return Err(CapbotError::Config("worker_count must be at least 1".into()));
        }
        if self.mention_batch_size == 0 {
            return Err(CapbotError::Config(
                "mention_batch_size must be at least 1".into(),
            ));
        }
        if self.reply_window.is_zero() {
            return Err(CapbotError::Config("reply_window must be positive".into()));
        }
        self.fetch_retry.validate("fetch_retry")?;
        self.download_retry.validate("download_retry")?;
        Ok(())
    }
}

/// API credentials plus the identity of the account they belong to.
///
/// Keys are opaque to this crate and handed to the social client untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub identity: BotIdentity,
    #[serde(default)]
    pub keys: serde_json::Map<String, serde_json::Value>,
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, CapbotError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CapbotError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| CapbotError::Credentials(format!("cannot parse {}: {e}", path.display())))
    }
}

fn default_caption_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Serialize a `Duration` as whole seconds.
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_object_gives_reference_defaults() {
        let config: BotConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.reply_window, Duration::from_secs(1200));
        assert_eq!(config.poll_interval, Duration::from_secs(12));
        assert_eq!(config.mention_batch_size, 200);
        assert_eq!(config.fetch_retry.max_attempts, 10);
        assert_eq!(config.download_retry.max_attempts, 6);
        assert_eq!(config.ingest_mode, IngestMode::Continuous);
    }

    #[test]
    fn durations_are_seconds() {
        let config: BotConfig =
            serde_json::from_str(r#"{"reply_window": 60, "ingest_mode": "batch"}"#).unwrap();
        assert_eq!(config.reply_window, Duration::from_secs(60));
        assert_eq!(config.ingest_mode, IngestMode::Batch);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["reply_window"], 60);
    }

    #[test]
    fn validate_rejects_missing_output_dir() {
        let config = BotConfig {
            output_dir: PathBuf::from("/definitely/not/here"),
            ..BotConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn validate_accepts_real_paths() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("fallback.png");
        std::fs::write(&fallback, b"png").unwrap();
        let config = BotConfig {
            output_dir: dir.path().to_path_buf(),
            fallback_image: fallback,
            ..BotConfig::default()
        };
        config.validate().unwrap();
        assert_eq!(config.failed_log_path(), dir.path().join("failed.tasks"));
    }

    #[rstest::rstest]
    #[case::zero_attempts(RetryPolicy { max_attempts: 0, ..RetryPolicy::backoff(3) })]
    #[case::negative_multiplier(RetryPolicy { multiplier: -2.0, ..RetryPolicy::backoff(3) })]
    #[case::nan_multiplier(RetryPolicy { multiplier: f64::NAN, ..RetryPolicy::backoff(3) })]
    #[case::shrinking_multiplier(RetryPolicy { multiplier: 0.5, ..RetryPolicy::backoff(3) })]
    #[case::cap_below_initial(RetryPolicy {
        initial_delay: Duration::from_secs(10),
        max_delay: Duration::from_secs(5),
        ..RetryPolicy::backoff(3)
    })]
    fn validate_rejects_bad_retry_policy(#[case] policy: RetryPolicy) {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("fallback.png");
        std::fs::write(&fallback, b"png").unwrap();
        let base = BotConfig {
            output_dir: dir.path().to_path_buf(),
            fallback_image: fallback,
            ..BotConfig::default()
        };

        let fetch = BotConfig {
            fetch_retry: policy.clone(),
            ..base.clone()
        };
        let err = fetch.validate().unwrap_err();
        assert!(matches!(err, CapbotError::Config(ref msg) if msg.starts_with("fetch_retry.")));
        assert_eq!(err.kind(), ErrorKind::Fatal);

        let download = BotConfig {
            download_retry: policy,
            ..base
        };
        assert!(matches!(
            download.validate(),
            Err(CapbotError::Config(ref msg)) if msg.starts_with("download_retry.")
        ));
    }

    #[test]
    fn unreadable_credentials_are_fatal() {
        let err = Credentials::load(Path::new("/no/such/creds.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn credentials_parse_identity() {
        let creds: Credentials = serde_json::from_str(
            r#"{"identity": {"user_id": 1, "screen_name": "capbot", "display_name": "Cap Bot"},
                "keys": {"consumer_key": "k"}}"#,
        )
        .unwrap();
        assert_eq!(creds.identity.screen_name, "capbot");
        assert_eq!(creds.keys["consumer_key"], "k");
    }
}
