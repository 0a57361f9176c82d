//! Errors - エラー型と分類
//!
//! すべての失敗は `ErrorKind` で運用分類されます。
//! - Transient: 一時的なエラー（リトライ推奨、タスクは pending のまま）
//! - Permanent: 恒久的なエラー（内部リトライしない、期限切れで退去）
//! - Fatal: 起動時の設定エラーのみ（ループ開始前にプロセスを止める）

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{MentionId, PostId};

/// ErrorKind は実行エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Error)]
pub enum CapbotError {
    #[error("social api request failed: {0}")]
    Api(String),

    #[error("post {0} not found")]
    PostNotFound(PostId),

    #[error("mention {0} is not a reply to any post")]
    NotAReply(MentionId),

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("captioning into {dest} failed: {reason}")]
    Caption { dest: PathBuf, reason: String },

    #[error("publishing reply failed: {0}")]
    Publish(String),

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("credentials: {0}")]
    Credentials(String),
}

impl CapbotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CapbotError::Api(_)
            | CapbotError::Download { .. }
            | CapbotError::Caption { .. }
            | CapbotError::Publish(_)
            | CapbotError::Io(_) => ErrorKind::Transient,
            CapbotError::PostNotFound(_) | CapbotError::NotAReply(_) | CapbotError::Malformed(_) => {
                ErrorKind::Permanent
            }
            CapbotError::Config(_) | CapbotError::Credentials(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<serde_json::Error> for CapbotError {
    fn from(err: serde_json::Error) -> Self {
        CapbotError::Malformed(err.to_string())
    }
}
