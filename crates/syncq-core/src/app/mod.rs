//! App - アプリケーション層
//!
//! ports と queue を組み合わせた実行ループを置きます。
//!
//! # 主要コンポーネント
//! - **ConnectivityMonitor**: 接続回復・定期タイマーで sync pass を起動

pub mod connectivity;

pub use self::connectivity::ConnectivityMonitor;
