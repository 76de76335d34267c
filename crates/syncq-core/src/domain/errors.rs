//! Errors - エラー型と分類
//!
//! どのエラーも `SyncQueue` の呼び出し元には伝播しません。
//! ログ・`SyncEvent`・`SyncReport` に変換されます。

use thiserror::Error;

/// Failure of the persistent queue store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a single delivery attempt.
///
/// Every variant counts toward `retry_count` in the same way: the queue does
/// not tell retryable failures (503, timeout) apart from permanent ones (400, 422).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("{url} responded with status {status}")]
    Status { status: u16, url: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
