//! App - アプリケーション層
//!
//! ports と queue を組み合わせて bot の動作を実装します。
//!
//! # 主要コンポーネント
//! - **BotBuilder**: 構築とワイヤリング（起動時検証）
//! - **Bot**: Poller と WorkerLoop 群の起動・停止（continuous / batch）
//! - **Poller**: メンションの取り込みと watermark 管理
//! - **WorkerLoop**: 保留メンションの選択・期限切れ退去・返信
//! - **Archiver**: ユーザーの投稿をキャプションだけして保存（返信しない）

pub mod archive;
pub mod builder;
pub mod poller;
pub mod runtime;
pub mod worker_loop;

pub use self::archive::{ArchiveReport, Archiver};
pub use self::builder::{BotBuilder, BuildError};
pub use self::poller::{PollReport, Poller};
pub use self::runtime::{BatchReport, Bot, BotHandle};
pub use self::worker_loop::{SelfReplyFilter, Tick, WorkerLoop, WorkerSettings};
