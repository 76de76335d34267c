//! ReqwestDispatcher - reqwest で queued request を送信
//!
//! - 相対 URL は base_url と結合する
//! - 2xx 以外のレスポンスは `DispatchError::Status`
//! - 認証ヘッダーなどは default_headers で付与する

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::domain::{DispatchError, HttpMethod};
use crate::ports::{DispatchRequest, Dispatcher};

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DispatchError::Timeout
        } else if e.is_builder() {
            DispatchError::InvalidRequest(e.to_string())
        } else {
            DispatchError::Transport(e.to_string())
        }
    }
}

pub struct ReqwestDispatcher {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ReqwestDispatcher {
    /// Wrap an already configured client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    pub fn builder() -> ReqwestDispatcherBuilder {
        ReqwestDispatcherBuilder::default()
    }

    fn resolve_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !is_absolute(url) => {
                format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
            }
            _ => url.to_string(),
        }
    }
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[async_trait]
impl Dispatcher for ReqwestDispatcher {
    async fn request(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        let url = self.resolve_url(&request.url);
        let mut builder = self.client.request(request.method.into(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(data) = &request.data {
            builder = builder.json(data);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(method = %request.method, %url, status = status.as_u16(), "dispatched");
            Ok(())
        } else {
            Err(DispatchError::Status {
                status: status.as_u16(),
                url,
            })
        }
    }
}

#[derive(Debug, Default)]
pub struct ReqwestDispatcherBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    headers: Vec<(String, String)>,
}

impl ReqwestDispatcherBuilder {
    /// Base for relative request URLs (e.g. `https://api.example.com`).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Header sent with every request (queued headers win on conflict).
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<ReqwestDispatcher, DispatchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DispatchError::InvalidRequest(format!("header {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| DispatchError::InvalidRequest(format!("header {name}: {e}")))?;
            headers.insert(name, value);
        }

        let mut client = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        let client = client.build()?;

        Ok(ReqwestDispatcher {
            client,
            base_url: self.base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::relative("/api/leases/1", "https://api.example.com/api/leases/1")]
    #[case::no_leading_slash("api/leases/1", "https://api.example.com/api/leases/1")]
    #[case::absolute("http://other.test/x", "http://other.test/x")]
    fn resolves_against_base(#[case] input: &str, #[case] expected: &str) {
        let dispatcher = ReqwestDispatcher::builder()
            .base_url("https://api.example.com/")
            .build()
            .unwrap();
        assert_eq!(dispatcher.resolve_url(input), expected);
    }

    #[test]
    fn without_base_urls_pass_through() {
        let dispatcher = ReqwestDispatcher::new(reqwest::Client::new());
        assert_eq!(dispatcher.resolve_url("/relative"), "/relative");
    }

    #[test]
    fn invalid_default_header_is_rejected() {
        let result = ReqwestDispatcher::builder()
            .default_header("bad header", "x")
            .build();
        assert!(matches!(result, Err(DispatchError::InvalidRequest(_))));
    }

    #[test]
    fn methods_map_to_reqwest() {
        assert_eq!(reqwest::Method::from(HttpMethod::Patch), reqwest::Method::PATCH);
        assert_eq!(reqwest::Method::from(HttpMethod::Delete), reqwest::Method::DELETE);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_delivery_failure() {
        let dispatcher = ReqwestDispatcher::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let request = DispatchRequest {
            method: HttpMethod::Post,
            url: "http://127.0.0.1:1/sync".to_string(),
            data: Some(serde_json::json!({})),
            headers: Default::default(),
        };
        assert!(dispatcher.request(&request).await.is_err());
    }
}
