//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryQueueStore**: 開発・テスト用のキューストア
//! - **JsonFileStore**: JSON ファイルによる永続化
//! - **ReqwestDispatcher**: reqwest による HTTP 送信
//! - **NoopEventSink / BroadcastEventSink**: イベント配信

pub mod event_sinks;
pub mod file_store;
pub mod http_dispatch;
pub mod memory_store;

// 主要な型を再エクスポート
pub use self::event_sinks::{BroadcastEventSink, NoopEventSink};
pub use self::file_store::JsonFileStore;
pub use self::http_dispatch::{ReqwestDispatcher, ReqwestDispatcherBuilder};
pub use self::memory_store::InMemoryQueueStore;
