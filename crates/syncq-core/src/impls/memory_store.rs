//! InMemoryQueueStore - 開発・テスト用のキューストア
//!
//! # 学習ポイント
//! - clone したハンドル同士が同じ backing cell を共有する
//!   → `SyncQueue` を作り直すことで「アプリ再起動」をシミュレートできる
//! - 保存時に JSON へシリアライズするので、永続化フォーマットも検証される

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::{QueuedRequest, StoreError};
use crate::ports::QueueStore;

#[derive(Default)]
struct Shared {
    /// 直近に保存された JSON（None = まだ何も保存されていない）
    raw: Mutex<Option<String>>,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

/// InMemoryQueueStore は JSON 文字列をメモリに保持するストア
#[derive(Clone, Default)]
pub struct InMemoryQueueStore {
    shared: Arc<Shared>,
}

impl InMemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously persisted JSON (which may be corrupt).
    pub fn with_raw(raw: impl Into<String>) -> Self {
        let store = Self::new();
        *store.lock_raw() = Some(raw.into());
        store
    }

    /// The JSON last written by `save`.
    pub fn raw(&self) -> Option<String> {
        self.lock_raw().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.shared.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.shared.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.shared.fail_saves.store(fail, Ordering::SeqCst);
    }

    fn lock_raw(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.shared.raw.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn load(&self) -> Result<Vec<QueuedRequest>, StoreError> {
        if self.shared.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("load failure injected".into()));
        }
        let Some(raw) = self.raw() else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(queue) => Ok(queue),
            Err(e) => {
                tracing::warn!(error = %e, "stored sync queue is corrupt, starting empty");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, queue: &[QueuedRequest]) -> Result<(), StoreError> {
        if self.shared.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("save failure injected".into()));
        }
        let raw = serde_json::to_string(queue)?;
        *self.lock_raw() = Some(raw);
        self.shared.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HttpMethod, RequestId, RequestMetadata};
    use chrono::Utc;
    use ulid::Ulid;

    fn sample(url: &str, retry_count: u32) -> QueuedRequest {
        let mut req = QueuedRequest::new(
            RequestId::from_ulid(Ulid::new()),
            url.to_string(),
            HttpMethod::Post,
            Some(serde_json::json!({"amount": 1200})),
            Utc::now(),
            5,
        );
        req.retry_count = retry_count;
        req.metadata = Some(RequestMetadata::entity("payment", url));
        req
    }

    #[tokio::test]
    async fn empty_store_loads_empty_queue() {
        let store = InMemoryQueueStore::new();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_preserves_order_and_fields() {
        let store = InMemoryQueueStore::new();
        let queue = vec![sample("/a", 0), sample("/b", 3), sample("/c", 1)];

        store.save(&queue).await.unwrap();

        // 別ハンドル = 再起動後のプロセス
        let reopened = store.clone();
        let loaded = reopened.load().await.unwrap();
        assert_eq!(loaded, queue);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn corrupt_state_is_treated_as_empty() {
        let store = InMemoryQueueStore::with_raw("{not json");
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let store = InMemoryQueueStore::new();
        store.set_fail_saves(true);
        store.set_fail_loads(true);

        assert!(matches!(store.save(&[]).await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.load().await, Err(StoreError::Unavailable(_))));
        assert_eq!(store.save_count(), 0);
    }
}
