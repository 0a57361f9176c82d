//! Post model: the subset of a social post the bot reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PostId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub screen_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    AnimatedGif,
}

/// One media attachment. For videos and GIFs `url` points at the still preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,

    /// Client attribution string reported by the API (e.g. the app that posted it).
    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<PostId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted: Option<PostId>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
}

impl Post {
    /// Canonical public URL of the post.
    pub fn url(&self) -> String {
        format!(
            "https://www.twitter.com/{}/status/{}",
            self.author.screen_name, self.id
        )
    }

    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    pub fn contains_video(&self) -> bool {
        self.media.iter().any(|m| m.kind == MediaKind::Video)
    }

    pub fn contains_gif(&self) -> bool {
        self.media.iter().any(|m| m.kind == MediaKind::AnimatedGif)
    }
}

/// Who the bot is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub user_id: UserId,
    pub screen_name: String,
    pub display_name: String,
}

impl BotIdentity {
    /// "display name (screen name)", used in caption end-notes.
    pub fn signature(&self) -> String {
        format!("{} ({})", self.display_name, self.screen_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::post;

    #[test]
    fn url_uses_author_and_id() {
        let p = post(42, "alice", "hi");
        assert_eq!(p.url(), "https://www.twitter.com/alice/status/42");
    }

    #[test]
    fn media_kinds_are_detected() {
        let mut p = post(1, "bob", "look");
        assert!(!p.has_media());
        p.media.push(Media {
            url: "https://pbs.example/media/abc.jpg".into(),
            kind: MediaKind::AnimatedGif,
        });
        assert!(p.has_media());
        assert!(p.contains_gif());
        assert!(!p.contains_video());
    }

    #[test]
    fn optional_fields_default_when_missing() {
        let json = r#"{
            "id": 9,
            "author": {"id": 3, "screen_name": "carol"},
            "text": "plain",
            "created_at": "2024-01-01T12:00:00Z"
        }"#;
        let p: Post = serde_json::from_str(json).unwrap();
        assert_eq!(p.in_reply_to, None);
        assert!(p.media.is_empty());
        assert_eq!(p.source, "");
    }
}
