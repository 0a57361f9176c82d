//! Captioner port - 画像へのキャプション描画

use std::path::Path;

use async_trait::async_trait;

use crate::error::CapbotError;

/// Captioner は元画像にキャプション行を重ねて `dest` に書き出す
///
/// 失敗は通常のエラーとして返すこと（プロセスを止めない）。
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, source: &Path, lines: &[String], dest: &Path)
    -> Result<(), CapbotError>;
}
