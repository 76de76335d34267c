//! Events - キューで発生したイベント
//!
//! 処理結果はエラーとして返さず、イベントとして `EventSink` に流します。

use std::time::Duration;

use serde::Serialize;

use super::RequestId;

/// Something that happened to a queued request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Enqueued {
        id: RequestId,
    },

    /// Delivered successfully and removed from the queue.
    Delivered {
        id: RequestId,
    },

    /// Delivery failed; the request stays queued for the next pass.
    RetryScheduled {
        id: RequestId,
        retry_count: u32,
        max_retries: u32,
        #[serde(with = "millis")]
        suggested_delay: Duration,
        error: String,
    },

    /// Delivery failed and the retry ceiling was reached; the request is gone.
    Dropped {
        id: RequestId,
        retry_count: u32,
        error: String,
    },

    /// Removed explicitly by the caller.
    Removed {
        id: RequestId,
    },

    Cleared {
        count: usize,
    },
}

impl SyncEvent {
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            SyncEvent::Enqueued { id }
            | SyncEvent::Delivered { id }
            | SyncEvent::RetryScheduled { id, .. }
            | SyncEvent::Dropped { id, .. }
            | SyncEvent::Removed { id } => Some(*id),
            SyncEvent::Cleared { .. } => None,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
