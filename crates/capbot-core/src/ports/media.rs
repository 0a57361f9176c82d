//! MediaTransport port - メディアのダウンロード

use std::path::Path;

use async_trait::async_trait;

use crate::error::CapbotError;

/// MediaTransport は URL の内容をファイルに保存
///
/// 成功以外のレスポンスステータスは失敗として扱います。
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), CapbotError>;
}
