//! SocialClient port - ソーシャル API クライアント
//!
//! メンション取得・投稿参照・返信投稿・セッション更新を抽象化します。
//! 実装（HTTP クライアント、認証）はこのクレートの関心外です。

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{BotIdentity, MentionId, Post, PostId};
use crate::error::CapbotError;

/// Which of a user's recent posts to read (archive mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFeed {
    Timeline,
    Favorites,
}

impl PostFeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostFeed::Timeline => "tweets",
            PostFeed::Favorites => "favorites",
        }
    }
}

#[async_trait]
pub trait SocialClient: Send + Sync {
    /// The account the client is authenticated as.
    fn identity(&self) -> BotIdentity;

    /// Up to `limit` mentions with id strictly greater than `since`, oldest first.
    /// `since = None` returns the most recent mentions.
    async fn fetch_mentions_since(
        &self,
        limit: usize,
        since: Option<MentionId>,
    ) -> Result<Vec<Post>, CapbotError>;

    async fn fetch_post(&self, id: PostId) -> Result<Post, CapbotError>;

    /// Publish `text` with the given media files as a reply; returns the new post id.
    async fn publish_reply(
        &self,
        media: &[PathBuf],
        text: &str,
        in_reply_to: PostId,
    ) -> Result<PostId, CapbotError>;

    async fn refresh_session(&self) -> Result<(), CapbotError>;

    async fn fetch_user_posts(
        &self,
        screen_name: &str,
        feed: PostFeed,
    ) -> Result<Vec<Post>, CapbotError>;
}
