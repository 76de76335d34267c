//! Dispatcher port - queued request の実際の送信
//!
//! 認証ヘッダーの付与やトークンの更新は、この port の実装側（アプリの HTTP client）が担当します。
//!
//! # 実装
//! - **ReqwestDispatcher**: reqwest ベース

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::{DispatchError, HttpMethod};

/// Request shape handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub method: HttpMethod,
    pub url: String,
    pub data: Option<serde_json::Value>,
    pub headers: BTreeMap<String, String>,
}

/// Dispatcher は 1 リクエストを送信する
///
/// # 契約
/// - `Ok(())`: 配送成功（2xx）
/// - `Err(_)`: 原因を問わず配送失敗（network / 4xx / 5xx / timeout）
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn request(&self, request: &DispatchRequest) -> Result<(), DispatchError>;
}
