//! Test fakes for the ports and small fixture builders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{
    AuditRecord, Author, BotIdentity, Mention, MentionId, Post, PostId, UserId,
};
use crate::error::CapbotError;
use crate::ports::{AuditSink, Captioner, MediaTransport, PostFeed, SocialClient};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn at_minutes(minutes: i64) -> DateTime<Utc> {
    epoch() + chrono::Duration::minutes(minutes)
}

pub fn identity() -> BotIdentity {
    BotIdentity {
        user_id: UserId::new(1),
        screen_name: "capbot".into(),
        display_name: "Cap Bot".into(),
    }
}

/// A post by `screen_name` created at `epoch()`.
pub fn post(id: u64, screen_name: &str, text: &str) -> Post {
    Post {
        id: PostId::new(id),
        author: Author {
            id: UserId::new(500),
            screen_name: screen_name.into(),
        },
        text: text.into(),
        created_at: epoch(),
        source: "Twitter Web App".into(),
        in_reply_to: None,
        quoted: None,
        media: Vec::new(),
    }
}

pub fn mention_post(id: u64, screen_name: &str, reply_to: u64) -> Post {
    let mut p = post(id, screen_name, "@capbot caption this please");
    p.in_reply_to = Some(PostId::new(reply_to));
    p
}

pub fn mention_replying_to(id: u64, screen_name: &str, reply_to: u64) -> Mention {
    Mention::observe(mention_post(id, screen_name, reply_to))
}

/// A mention replying to post 1000.
pub fn mention(id: u64, screen_name: &str) -> Mention {
    mention_replying_to(id, screen_name, 1000)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedReply {
    pub id: PostId,
    pub media: Vec<PathBuf>,
    pub text: String,
    pub in_reply_to: PostId,
}

/// In-memory social API.
pub struct FakeSocial {
    posts: Mutex<BTreeMap<PostId, Post>>,
    mentions: Mutex<Vec<Post>>,
    published: Mutex<Vec<PublishedReply>>,
    mention_failures: AtomicU32,
    mention_fetches: AtomicU32,
    refreshes: AtomicU32,
    next_reply: AtomicU64,
}

impl FakeSocial {
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(BTreeMap::new()),
            mentions: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            mention_failures: AtomicU32::new(0),
            mention_fetches: AtomicU32::new(0),
            refreshes: AtomicU32::new(0),
            next_reply: AtomicU64::new(9000),
        }
    }

    pub fn add_post(&self, post: Post) {
        self.posts.lock().unwrap().insert(post.id, post);
    }

    pub fn add_mention(&self, post: Post) {
        self.mentions.lock().unwrap().push(post);
    }

    /// Fail the next `n` mention fetches.
    pub fn fail_mention_fetches(&self, n: u32) {
        self.mention_failures.store(n, Ordering::SeqCst);
    }

    pub fn mention_fetches(&self) -> u32 {
        self.mention_fetches.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> u32 {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<PublishedReply> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialClient for FakeSocial {
    fn identity(&self) -> BotIdentity {
        identity()
    }

    async fn fetch_mentions_since(
        &self,
        limit: usize,
        since: Option<MentionId>,
    ) -> Result<Vec<Post>, CapbotError> {
        self.mention_fetches.fetch_add(1, Ordering::SeqCst);
        let left = self.mention_failures.load(Ordering::SeqCst);
        if left > 0 {
            self.mention_failures.store(left - 1, Ordering::SeqCst);
            return Err(CapbotError::Api("rate limited".into()));
        }
        let mut mentions: Vec<Post> = self.mentions.lock().unwrap().clone();
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
        self.posts
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(CapbotError::PostNotFound(id))
    }

    async fn publish_reply(
        &self,
        media: &[PathBuf],
        text: &str,
        in_reply_to: PostId,
    ) -> Result<PostId, CapbotError> {
        let id = PostId::new(self.next_reply.fetch_add(1, Ordering::SeqCst));
        self.published.lock().unwrap().push(PublishedReply {
            id,
            media: media.to_vec(),
            text: text.to_string(),
            in_reply_to,
        });
        Ok(id)
    }

    async fn refresh_session(&self) -> Result<(), CapbotError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_user_posts(
        &self,
        screen_name: &str,
        _feed: PostFeed,
    ) -> Result<Vec<Post>, CapbotError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.author.screen_name == screen_name)
            .cloned()
            .collect())
    }
}

/// Fails the first `failures` downloads, then writes a placeholder file.
pub struct FlakyTransport {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyTransport {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaTransport for FlakyTransport {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), CapbotError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(CapbotError::Download {
                url: url.to_string(),
                reason: "received status 503".into(),
            });
        }
        tokio::fs::write(dest, b"image").await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionCall {
    pub source: PathBuf,
    pub lines: Vec<String>,
    pub dest: PathBuf,
}

/// Records every successful caption call; can be told to fail.
#[derive(Default)]
pub struct RecordingCaptioner {
    calls: Mutex<Vec<CaptionCall>>,
    failures: AtomicU32,
}

impl RecordingCaptioner {
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<CaptionCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Captioner for RecordingCaptioner {
    async fn caption(
        &self,
        source: &Path,
        lines: &[String],
        dest: &Path,
    ) -> Result<(), CapbotError> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(CapbotError::Caption {
                dest: dest.to_path_buf(),
                reason: "renderer crashed".into(),
            });
        }
        self.calls.lock().unwrap().push(CaptionCall {
            source: source.to_path_buf(),
            lines: lines.to_vec(),
            dest: dest.to_path_buf(),
        });
        Ok(())
    }
}

/// Keeps audit records in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<AuditRecord> {
        self.records().into_iter().filter(|r| r.is_completed()).collect()
    }

    pub fn failed(&self) -> Vec<AuditRecord> {
        self.records().into_iter().filter(|r| !r.is_completed()).collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), CapbotError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }
}
