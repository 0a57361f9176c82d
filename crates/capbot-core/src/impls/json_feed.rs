//! JsonFeedClient - 開発用のファイルベース SocialClient
//!
//! # 実装詳細
//! - フィードファイル（JSON）を呼び出しごとに読み直す（実行中に編集できる）
//! - 返信は outbox ファイルに JSON Lines で追記
//! - 本番用の API クライアントはこのクレートの外で実装します
//!
//! # フィード形式
//! ```json
//! {
//!   "mentions": [ { "id": 11, "author": {...}, "text": "@bot", "created_at": "...", "in_reply_to": 10 } ],
//!   "posts":    [ { "id": 10, ... } ],
//!   "favorites": { "alice": [10] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::domain::{BotIdentity, MentionId, Post, PostId};
use crate::error::CapbotError;
use crate::ports::{PostFeed, SocialClient};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub mentions: Vec<Post>,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub favorites: BTreeMap<String, Vec<PostId>>,
}

/// One published reply as written to the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: PostId,
    pub in_reply_to: PostId,
    pub text: String,
    pub media: Vec<PathBuf>,
}

pub struct JsonFeedClient {
    identity: BotIdentity,
    feed_path: PathBuf,
    outbox_path: PathBuf,
    next_id: AtomicU64,
}

impl JsonFeedClient {
    pub fn new(identity: BotIdentity, feed_path: impl Into<PathBuf>, outbox_path: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            feed_path: feed_path.into(),
            outbox_path: outbox_path.into(),
            next_id: AtomicU64::new(Utc::now().timestamp_millis().max(0) as u64),
        }
    }

    pub fn outbox_path(&self) -> &Path {
        &self.outbox_path
    }

    async fn load(&self) -> Result<Feed, CapbotError> {
        let raw = tokio::fs::read_to_string(&self.feed_path).await.map_err(|e| {
            CapbotError::Api(format!("cannot read feed {}: {e}", self.feed_path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl SocialClient for JsonFeedClient {
    fn identity(&self) -> BotIdentity {
        self.identity.clone()
    }

    async fn fetch_mentions_since(
        &self,
        limit: usize,
        since: Option<MentionId>,
    ) -> Result<Vec<Post>, CapbotError> {
        let mut mentions = self.load().await?.mentions;
        mentions.sort_by_key(|p| p.id);
        let mentions = match since {
            Some(since) => mentions
                .into_iter()
                .filter(|p| p.id.get() > since.get())
                .take(limit)
                .collect(),
            None => {
                let skip = mentions.len().saturating_sub(limit);
                mentions.into_iter().skip(skip).collect()
            }
        };
        Ok(mentions)
    }

    async fn fetch_post(&self, id: PostId) -> Result<Post, CapbotError> {
        let feed = self.load().await?;
        feed.posts
            .into_iter()
            .chain(feed.mentions)
            .find(|p| p.id == id)
            .ok_or(CapbotError::PostNotFound(id))
    }

    async fn publish_reply(
        &self,
        media: &[PathBuf],
        text: &str,
        in_reply_to: PostId,
    ) -> Result<PostId, CapbotError> {
        let entry = OutboxEntry {
            id: PostId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            in_reply_to,
            text: text.to_string(),
            media: media.to_vec(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.outbox_path)
            .await
            .map_err(|e| CapbotError::Publish(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| CapbotError::Publish(e.to_string()))?;
        Ok(entry.id)
    }

    async fn refresh_session(&self) -> Result<(), CapbotError> {
        // nothing to renew for a local file, but surface a vanished feed early
        if tokio::fs::metadata(&self.feed_path).await.is_err() {
            return Err(CapbotError::Api(format!(
                "feed {} disappeared",
                self.feed_path.display()
            )));
        }
        Ok(())
    }

    async fn fetch_user_posts(
        &self,
        screen_name: &str,
        feed: PostFeed,
    ) -> Result<Vec<Post>, CapbotError> {
        let data = self.load().await?;
        let posts = match feed {
            PostFeed::Timeline => data
                .posts
                .into_iter()
                .filter(|p| p.author.screen_name == screen_name)
                .collect(),
            PostFeed::Favorites => {
                let favorites = data.favorites.get(screen_name).cloned().unwrap_or_default();
                data.posts
                    .into_iter()
                    .filter(|p| favorites.contains(&p.id))
                    .collect()
            }
        };
        Ok(posts)
    }
}
