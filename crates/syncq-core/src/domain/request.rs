//! Queued request model: what a pending mutation looks like in memory and on disk.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RequestId;
use crate::ports::DispatchRequest;

/// HTTP method of a queued request (fixed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported http method: {0}")]
pub struct ParseMethodError(String);

impl FromStr for HttpMethod {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(ParseMethodError(s.to_string())),
        }
    }
}

/// Descriptive tags for display and lookup. Never used for delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RequestMetadata {
    pub fn entity(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            entity_id: Some(entity_id.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Optional per-request overrides for `SyncQueue::add_to_queue`.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    pub headers: BTreeMap<String, String>,
    pub max_retries: Option<u32>,
    pub metadata: Option<RequestMetadata>,
}

impl EnqueueOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn metadata(mut self, metadata: RequestMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A pending mutation awaiting delivery.
///
/// Design:
/// - Only the queue manager mutates a record once it is queued.
/// - `retry_count` only grows, and never beyond `max_retries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequest {
    pub id: RequestId,
    pub url: String,
    pub method: HttpMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Enqueue time.
    pub timestamp: DateTime<Utc>,

    pub retry_count: u32,
    pub max_retries: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RequestMetadata>,

    /// Error message of the most recent failed delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueuedRequest {
    /// `max_retries` is clamped to at least 1 so a request always gets one attempt.
    pub fn new(
        id: RequestId,
        url: String,
        method: HttpMethod,
        data: Option<serde_json::Value>,
        timestamp: DateTime<Utc>,
        max_retries: u32,
    ) -> Self {
        Self {
            id,
            url,
            method,
            data,
            headers: BTreeMap::new(),
            timestamp,
            retry_count: 0,
            max_retries: max_retries.max(1),
            metadata: None,
            last_error: None,
        }
    }

    /// Record a failed delivery and return the new retry count.
    pub fn record_failure(&mut self, error: String) -> u32 {
        self.retry_count = (self.retry_count + 1).min(self.max_retries);
        self.last_error = Some(error);
        self.retry_count
    }

    /// Has this request used up all its attempts?
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Has this request failed at least once?
    pub fn has_failed(&self) -> bool {
        self.retry_count > 0
    }

    /// Does the metadata match `entity_type` (and `entity_id`, when given)?
    pub fn matches_entity(&self, entity_type: &str, entity_id: Option<&str>) -> bool {
        let Some(meta) = &self.metadata else {
            return false;
        };
        if meta.entity_type.as_deref() != Some(entity_type) {
            return false;
        }
        match entity_id {
            Some(id) => meta.entity_id.as_deref() == Some(id),
            None => true,
        }
    }

    /// The shape handed to the dispatcher.
    pub fn to_dispatch(&self) -> DispatchRequest {
        DispatchRequest {
            method: self.method,
            url: self.url.clone(),
            data: self.data.clone(),
            headers: self.headers.clone(),
        }
    }
}
