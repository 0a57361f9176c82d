//! Ports - 抽象化レイヤー
//!
//! 外部の協力者（ソーシャル API、メディア転送、キャプション描画、監査ログ、時計）
//! へのインターフェースを定義します。実装は `impls` またはクレート外にあります。

pub mod audit_sink;
pub mod captioner;
pub mod clock;
pub mod media;
pub mod social;

pub use self::audit_sink::AuditSink;
pub use self::captioner::Captioner;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::media::MediaTransport;
pub use self::social::{PostFeed, SocialClient};
