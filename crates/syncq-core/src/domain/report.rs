//! SyncReport: summary of one processing pass.

use std::time::Duration;

use serde::Serialize;

use super::RequestId;

/// How a `process_queue` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcome {
    /// A pass ran over the snapshot.
    Completed,

    /// Another pass was in flight; nothing was dispatched.
    AlreadyRunning,

    /// The queue was empty; nothing was dispatched.
    Empty,
}

/// Result of one processing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub outcome: PassOutcome,
    pub delivered: Vec<RequestId>,
    pub retried: Vec<RequestId>,
    pub dropped: Vec<RequestId>,

    /// Smallest suggested backoff among retried requests.
    /// The queue does not sleep; callers may use this to schedule the next pass.
    #[serde(
        rename = "next_delay_ms",
        serialize_with = "opt_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_delay: Option<Duration>,
}

impl SyncReport {
    pub(crate) fn new(outcome: PassOutcome) -> Self {
        Self {
            outcome,
            delivered: Vec::new(),
            retried: Vec::new(),
            dropped: Vec::new(),
            next_delay: None,
        }
    }

    pub fn ran(&self) -> bool {
        self.outcome == PassOutcome::Completed
    }

    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed()
    }

    pub fn failed(&self) -> usize {
        self.retried.len() + self.dropped.len()
    }

    pub(crate) fn record_retry(&mut self, id: RequestId, delay: Duration) {
        self.retried.push(id);
        self.next_delay = Some(match self.next_delay {
            Some(current) => current.min(delay),
            None => delay,
        });
    }
}

fn opt_millis<S: serde::Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&(d.as_millis() as u64)),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn next_delay_keeps_the_smallest() {
        let mut report = SyncReport::new(PassOutcome::Completed);
        report.record_retry(RequestId::from_ulid(Ulid::new()), Duration::from_millis(4_000));
        report.record_retry(RequestId::from_ulid(Ulid::new()), Duration::from_millis(1_500));
        report.record_retry(RequestId::from_ulid(Ulid::new()), Duration::from_millis(9_000));

        assert_eq!(report.next_delay, Some(Duration::from_millis(1_500)));
        assert_eq!(report.failed(), 3);
        assert_eq!(report.attempted(), 3);
    }

    #[test]
    fn skipped_passes_did_not_run() {
        assert!(!SyncReport::new(PassOutcome::AlreadyRunning).ran());
        assert!(!SyncReport::new(PassOutcome::Empty).ran());
        assert!(SyncReport::new(PassOutcome::Completed).ran());
    }
}
