//! AuditSink port - 終端結果の記録
//!
//! 完了・失敗の監査レコードを追記専用で保存します。
//! 診断用の記録であり、復旧に使うトランザクション状態ではありません。

use async_trait::async_trait;

use crate::domain::AuditRecord;
use crate::error::CapbotError;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), CapbotError>;
}
