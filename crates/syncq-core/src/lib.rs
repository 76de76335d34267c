//! syncq-core
//!
//! Offline sync queue: durably queues outbound HTTP mutations made while a
//! client is offline and replays them with bounded retries.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, request, errors, events, report）
//! - **ports**: 抽象化レイヤー（QueueStore, Dispatcher, Clock, IdGenerator, EventSink）
//! - **queue**: SyncQueue 本体（manager, retry policy, listeners）
//! - **impls**: ports の実装（InMemory/JSON file store, reqwest dispatcher, event sinks）
//! - **app**: 実行ループ（ConnectivityMonitor）
//! - **config**: 設定（SyncConfig）
//! - **observability**: ステータス表示用のビュー

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

pub use config::{ConfigError, SyncConfig};
pub use domain::{
    DispatchError, EnqueueOptions, HttpMethod, PassOutcome, QueuedRequest, RequestId,
    RequestMetadata, StoreError, SyncEvent, SyncReport,
};
pub use observability::SyncStatus;
pub use queue::{RetryPolicy, Subscription, SyncQueue, SyncQueueBuilder};
