//! QueueStore port - キューの永続化
//!
//! 固定キー（デフォルト `@sync_queue`）の下に、キュー全体を JSON 配列として保存します。
//! ストレージ技術そのものは実装側の関心事です。
//!
//! # 実装
//! - **InMemoryQueueStore**: テスト・開発用（再起動のシミュレーション）
//! - **JsonFileStore**: ファイル 1 つにキュー全体を保存

use async_trait::async_trait;

use crate::domain::{QueuedRequest, StoreError};

/// QueueStore は queue 全体を読み書きする
///
/// # 設計原則
/// - 部分更新はしない（毎回フルスナップショットを書く）
/// - 過去の状態がない・壊れている場合、`load` は空のキューを返す
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn load(&self) -> Result<Vec<QueuedRequest>, StoreError>;

    async fn save(&self, queue: &[QueuedRequest]) -> Result<(), StoreError>;
}
