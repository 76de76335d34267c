//! Request identifiers.
//!
//! # ULID ベースの ID
//! `RequestId` は ULID をラップした newtype です。
//! - **時刻でソート可能**: timestamp が先頭にあるため、enqueue 順に並ぶ
//! - **ランダム部分**: 同一ミリ秒内で生成しても衝突しない
//!
//! 永続化フォーマットでは `req-<ULID>` の文字列として保存します。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

const PREFIX: &str = "req-";

/// Identifier of a queued request.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Ulid);

impl RequestId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for RequestId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid request id {input:?}: {reason}")]
pub struct ParseRequestIdError {
    input: String,
    reason: ulid::DecodeError,
}

impl FromStr for RequestId {
    type Err = ParseRequestIdError;

    /// Accepts both `req-<ULID>` and a bare ULID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(PREFIX).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self)
            .map_err(|reason| ParseRequestIdError {
                input: s.to_string(),
                reason,
            })
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_prefix() {
        let ulid = Ulid::new();
        let id = RequestId::from_ulid(ulid);
        assert_eq!(id.to_string(), format!("req-{ulid}"));
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn parses_with_and_without_prefix() {
        let id = RequestId::from_ulid(Ulid::new());

        let prefixed: RequestId = id.to_string().parse().unwrap();
        let bare: RequestId = id.as_ulid().to_string().parse().unwrap();

        assert_eq!(prefixed, id);
        assert_eq!(bare, id);
    }

    #[test]
    fn rejects_garbage() {
        let err = "req-not-a-ulid".parse::<RequestId>().unwrap_err();
        assert!(err.to_string().contains("req-not-a-ulid"));
    }

    #[test]
    fn serializes_as_prefixed_string() {
        let id = RequestId::from_ulid(Ulid::new());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let a = RequestId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = RequestId::from_ulid(Ulid::new());
        assert!(a < b);
    }
}
