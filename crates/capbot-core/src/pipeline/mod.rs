//! ReplyPipeline - メンション 1 件を返信 ID かエラーに変換する
//!
//! # フロー
//! 1. メンションの返信先の投稿（と引用投稿）を取得
//! 2. 出力ユニットを決定（メディアごと、またはフォールバック画像 1 枚）
//! 3. メディアをダウンロード（RetryPolicy で有限回リトライ）
//! 4. キャプション描画（失敗は通常のエラー、プロセスは止めない）
//! 5. リダイレクト HTML を書く（ベストエフォート）
//! 6. 返信を投稿して ID を返す

pub mod captions;
pub mod naming;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Mention, Post, PostId};
use crate::error::CapbotError;
use crate::ports::{Captioner, MediaTransport, SocialClient};
use crate::queue::RetryPolicy;

pub use self::captions::caption_lines;
pub use self::naming::{OutputUnit, plan_units, redirect_file_name};

/// A handler that turns one pending mention into a published reply.
///
/// The worker loop only knows this trait, so tests can swap the whole
/// pipeline for a stub.
#[async_trait]
pub trait MentionHandler: Send + Sync {
    async fn handle(&self, mention: &Mention) -> Result<PostId, CapbotError>;
}

/// The post being captioned, with its quoted post if any.
#[derive(Debug, Clone)]
pub struct ResolvedPost {
    pub post: Post,
    pub quoted: Option<Post>,
}

pub struct ReplyPipeline {
    social: Arc<dyn SocialClient>,
    transport: Arc<dyn MediaTransport>,
    captioner: Arc<dyn Captioner>,
    download_retry: RetryPolicy,
    output_root: PathBuf,
    fallback_image: PathBuf,
    response_text: String,
}

impl ReplyPipeline {
    pub fn new(
        social: Arc<dyn SocialClient>,
        transport: Arc<dyn MediaTransport>,
        captioner: Arc<dyn Captioner>,
        download_retry: RetryPolicy,
        output_root: impl Into<PathBuf>,
        fallback_image: impl Into<PathBuf>,
        response_text: impl Into<String>,
    ) -> Self {
        Self {
            social,
            transport,
            captioner,
            download_retry,
            output_root: output_root.into(),
            fallback_image: fallback_image.into(),
            response_text: response_text.into(),
        }
    }

    pub async fn resolve(&self, id: PostId) -> Result<ResolvedPost, CapbotError> {
        let post = self.social.fetch_post(id).await?;
        let quoted = match post.quoted {
            Some(quoted_id) => Some(self.social.fetch_post(quoted_id).await?),
            None => None,
        };
        Ok(ResolvedPost { post, quoted })
    }

    /// Resolve a post and caption every unit of it under `root`.
    ///
    /// Returns the captioned file paths in unit order.
    pub async fn caption_post(&self, id: PostId, root: &Path) -> Result<Vec<PathBuf>, CapbotError> {
        let resolved = self.resolve(id).await?;
        self.caption_resolved(&resolved, root).await
    }

    pub async fn caption_resolved(
        &self,
        resolved: &ResolvedPost,
        root: &Path,
    ) -> Result<Vec<PathBuf>, CapbotError> {
        let post = &resolved.post;
        let units = plan_units(post, resolved.quoted.as_ref());
        let lines = caption_lines(post, resolved.quoted.as_ref(), &self.social.identity());

        let author_dir = root.join(naming::author_dir_name(post));
        tokio::fs::create_dir_all(&author_dir).await?;

        tracing::info!(post_id = %post.id, units = units.len(), "captioning started");
        let mut captioned = Vec::with_capacity(units.len());
        for unit in &units {
            let dest = author_dir.join(&unit.captioned_file_name);
            let source = match &unit.media_url {
                Some(url) if unit.is_media => {
                    let source = author_dir.join(&unit.raw_file_name);
                    self.download(url, &source).await?;
                    source
                }
                _ => self.fallback_image.clone(),
            };
            self.captioner.caption(&source, &lines, &dest).await?;
            captioned.push(dest);
        }
        tracing::info!(post_id = %post.id, "captioning completed");

        let redirect = author_dir.join(redirect_file_name(post));
        if let Err(err) = write_redirect(&redirect, &post.url()).await {
            tracing::warn!(path = %redirect.display(), error = %err, "redirect page not written");
        }

        Ok(captioned)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), CapbotError> {
        self.download_retry
            .run("media download", || self.transport.download(url, dest))
            .await
            .map_err(|err| match err {
                CapbotError::Download { .. } => err,
                other => CapbotError::Download {
                    url: url.to_string(),
                    reason: other.to_string(),
                },
            })
    }

    fn reply_text(&self, mention: &Mention) -> String {
        format!("@{} {}", mention.actor(), self.response_text)
    }
}

#[async_trait]
impl MentionHandler for ReplyPipeline {
    async fn handle(&self, mention: &Mention) -> Result<PostId, CapbotError> {
        let target = mention
            .post
            .in_reply_to
            .ok_or(CapbotError::NotAReply(mention.id))?;

        tracing::info!(mention_id = %mention.id, actor = mention.actor(), %target, "preparing reply");
        let paths = self.caption_post(target, &self.output_root).await?;

        let reply_id = self
            .social
            .publish_reply(&paths, &self.reply_text(mention), mention.id.as_post())
            .await?;
        tracing::info!(mention_id = %mention.id, %reply_id, "reply published");
        Ok(reply_id)
    }
}

/// Minimal page that forwards to the original post.
async fn write_redirect(path: &Path, url: &str) -> Result<(), CapbotError> {
    let body = format!("<script> location.href = \"{url}\" </script>");
    tokio::fs::write(path, body).await?;
    Ok(())
}
