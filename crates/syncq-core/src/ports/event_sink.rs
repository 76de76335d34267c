//! EventSink port - イベント記録の抽象化
//!
//! # 実装
//! - NoopEventSink: 何もしない（デフォルト）
//! - BroadcastEventSink: tokio broadcast channel で購読者に配信

use crate::domain::SyncEvent;

/// EventSink は `SyncEvent` を記録
///
/// `emit` は同期・非ブロッキングであること（キュー処理を止めない）。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}
