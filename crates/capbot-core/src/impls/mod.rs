//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **FileAuditLog**: `completed.tasks` / `failed.tasks` への追記
//! - **HttpTransport**: reqwest によるメディアのダウンロード
//! - **CommandCaptioner**: 外部プログラムによるキャプション描画
//! - **JsonFeedClient**: ローカル実行用のファイルベース SocialClient
//!
//! 本番の SNS API クライアントは別クレートに置きます。

pub mod command_captioner;
pub mod file_audit;
pub mod http_transport;
pub mod json_feed;

pub use self::command_captioner::CommandCaptioner;
pub use self::file_audit::FileAuditLog;
pub use self::http_transport::HttpTransport;
pub use self::json_feed::{Feed, JsonFeedClient, OutboxEntry};
