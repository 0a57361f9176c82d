//! FileAuditLog - 追記専用のテキストファイル監査ログ
//!
//! # 実装詳細
//! - 完了は `completed.tasks`、失敗は `failed.tasks` に 1 行ずつ追記
//! - 書き込みごとにファイルを開いて閉じる（ロックは持たない）
//! - クラッシュ時の書きかけ行は許容（診断用の記録）

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::domain::AuditRecord;
use crate::error::CapbotError;
use crate::ports::AuditSink;

pub struct FileAuditLog {
    completed_path: PathBuf,
    failed_path: PathBuf,
}

impl FileAuditLog {
    pub fn new(completed_path: impl Into<PathBuf>, failed_path: impl Into<PathBuf>) -> Self {
        Self {
            completed_path: completed_path.into(),
            failed_path: failed_path.into(),
        }
    }

    /// `completed.tasks` and `failed.tasks` under `root`.
    pub fn in_dir(root: &Path) -> Self {
        Self::new(root.join("completed.tasks"), root.join("failed.tasks"))
    }

    pub fn completed_path(&self) -> &Path {
        &self.completed_path
    }

    pub fn failed_path(&self) -> &Path {
        &self.failed_path
    }
}

#[async_trait]
impl AuditSink for FileAuditLog {
    async fn record(&self, record: AuditRecord) -> Result<(), CapbotError> {
        let path = if record.is_completed() {
            &self.completed_path
        } else {
            &self.failed_path
        };
        let mut line = record.to_line();
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
