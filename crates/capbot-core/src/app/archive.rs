//! Archive mode: caption a user's recent posts (or favourites) without replying.
//!
//! Output layout under the output root:
//! - `{screen}_{MM_DD_YYYY_HH_MM}_{feed}.json`: the fetched posts
//! - `{screen}_{feed}_{MM_DD_YYYY_HH_MM}/`: captioned files, one author dir per post author
//!
//! A post that fails to caption is logged and skipped; the run continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::domain::PostId;
use crate::error::CapbotError;
use crate::pipeline::ReplyPipeline;
use crate::ports::{Clock, PostFeed, SocialClient};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveReport {
    /// Saved post dump.
    pub dump_path: PathBuf,
    pub caption_dir: PathBuf,
    pub captioned: Vec<PathBuf>,
    pub failures: Vec<(PostId, String)>,
}

pub struct Archiver {
    social: Arc<dyn SocialClient>,
    pipeline: Arc<ReplyPipeline>,
    clock: Arc<dyn Clock>,
}

impl Archiver {
    pub fn new(social: Arc<dyn SocialClient>, pipeline: Arc<ReplyPipeline>, clock: Arc<dyn Clock>) -> Self {
        Self {
            social,
            pipeline,
            clock,
        }
    }

    pub async fn archive(
        &self,
        screen_name: &str,
        feed: PostFeed,
        output_root: &Path,
    ) -> Result<ArchiveReport, CapbotError> {
        let stamp = self.clock.now().format("%m_%d_%Y_%H_%M").to_string();
        let posts = self.social.fetch_user_posts(screen_name, feed).await?;
        tracing::info!(screen_name, feed = feed.as_str(), posts = posts.len(), "archive started");

        let dump_path = output_root.join(format!("{screen_name}_{stamp}_{}.json", feed.as_str()));
        tokio::fs::write(&dump_path, serde_json::to_vec_pretty(&posts)?).await?;

        let caption_dir = output_root.join(format!("{screen_name}_{}_{stamp}", feed.as_str()));
        tokio::fs::create_dir_all(&caption_dir).await?;

        let mut report = ArchiveReport {
            dump_path,
            caption_dir,
            ..ArchiveReport::default()
        };
        let total = posts.len();
        for (n, post) in posts.iter().enumerate() {
            match self.pipeline.caption_post(post.id, &report.caption_dir).await {
                Ok(paths) => {
                    tracing::info!(task = n + 1, total, post_id = %post.id, "post captioned");
                    report.captioned.extend(paths);
                }
                Err(err) => {
                    tracing::warn!(task = n + 1, total, post_id = %post.id, error = %err, "post skipped");
                    report.failures.push((post.id, err.to_string()));
                }
            }
        }
        Ok(report)
    }
}
