//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（永続ストレージ、HTTP transport など）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//! `SyncQueue` はこれらを構築時に受け取ります（グローバルな singleton は持たない）。

pub mod clock;
pub mod dispatch;
pub mod event_sink;
pub mod id_generator;
pub mod queue_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::dispatch::{DispatchRequest, Dispatcher};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::queue_store::QueueStore;
