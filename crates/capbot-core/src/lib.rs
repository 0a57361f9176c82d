//! capbot-core
//!
//! Core of a mention-driven captioning bot: mentions are polled into an
//! in-memory task store, workers caption the post each mention replies to and
//! publish the result as a reply.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, post, mention, outcome）
//! - **ports**: 外部協力者の抽象化（SocialClient, MediaTransport, Captioner, AuditSink, Clock）
//! - **queue**: TaskStore / Watermark / RetryPolicy
//! - **pipeline**: メンション 1 件を返信に変換する ReplyPipeline
//! - **app**: builder, runtime, poller, worker_loop, archive
//! - **impls**: ports の実装（ファイル監査ログ、HTTP ダウンロード、外部コマンド、JSON フィード）

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod pipeline;
pub mod ports;
pub mod queue;

#[cfg(test)]
mod test_support;
