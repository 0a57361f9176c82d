//! Domain identifiers (strongly-typed IDs).
//!
//! ソーシャル API の ID は数値（u64）です。Phantom type パターンで
//! `MentionId` / `PostId` / `UserId` を別の型として扱い、混同を防ぎます。
//!
//! `Display` は数値そのものを出力します（監査ログやファイル名にそのまま使うため）。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Debug 出力で使う型名を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn name() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData で、実行時にはメモリを消費しませんが、
/// コンパイル時に型安全性を提供します。
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: u64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub const fn new(value: u64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> u64 {
        self.value
    }
}

impl<T: IdMarker> From<u64> for Id<T> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::name(), self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mention {}

impl IdMarker for Mention {
    fn name() -> &'static str {
        "MentionId"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Post {}

impl IdMarker for Post {
    fn name() -> &'static str {
        "PostId"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn name() -> &'static str {
        "UserId"
    }
}

/// Identifier of a mention (the inbound post addressed to the bot).
pub type MentionId = Id<Mention>;

/// Identifier of any post.
pub type PostId = Id<Post>;

/// Identifier of an account.
pub type UserId = Id<User>;

impl MentionId {
    /// A mention is itself a post; replies are addressed to this id.
    pub fn as_post(&self) -> PostId {
        PostId::new(self.value)
    }
}

/// Token identifying one in-flight lease of a mention.
///
/// ULID なので発行順にソート可能で、ログ上で lease の前後関係を追えます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseToken(Ulid);

impl LeaseToken {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lease-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_as_bare_numbers() {
        let mention = MentionId::new(1_234_567_890);
        assert_eq!(mention.to_string(), "1234567890");
        assert_eq!(format!("{mention:?}"), "MentionId(1234567890)");
    }

    #[test]
    fn ids_are_ordered_numerically() {
        assert!(MentionId::new(9) < MentionId::new(10));
        assert!(PostId::new(100) > PostId::new(99));
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = UserId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn mention_converts_to_post() {
        assert_eq!(MentionId::new(5).as_post(), PostId::new(5));
    }

    #[test]
    fn lease_tokens_are_unique() {
        assert_ne!(LeaseToken::generate(), LeaseToken::generate());
        assert!(LeaseToken::generate().to_string().starts_with("lease-"));
    }
}
