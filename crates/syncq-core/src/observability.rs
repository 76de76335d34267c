use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of the queue for status indicators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub pending: usize,

    /// Still queued after at least one failed delivery.
    pub failed: usize,

    pub in_progress: bool,

    /// End of the last completed pass.
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl SyncStatus {
    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }
}
