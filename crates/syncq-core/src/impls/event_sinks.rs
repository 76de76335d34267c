//! EventSink 実装
//!
//! - NoopEventSink: 何もしない
//! - BroadcastEventSink: tokio broadcast で複数の受信者に配信

use tokio::sync::broadcast;

use crate::domain::SyncEvent;
use crate::ports::EventSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: SyncEvent) {}
}

/// Fans events out to every receiver.
///
/// A slow receiver lags and loses the oldest events; it never blocks the queue.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<SyncEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: SyncEvent) {
        // no receivers is fine
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RequestId;
    use ulid::Ulid;

    #[tokio::test]
    async fn broadcast_delivers_to_every_receiver() {
        let sink = BroadcastEventSink::new(8);
        let mut rx1 = sink.subscribe();
        let mut rx2 = sink.subscribe();

        let id = RequestId::from_ulid(Ulid::new());
        sink.emit(SyncEvent::Enqueued { id });

        assert_eq!(rx1.recv().await.unwrap(), SyncEvent::Enqueued { id });
        assert_eq!(rx2.recv().await.unwrap(), SyncEvent::Enqueued { id });
    }

    #[test]
    fn emit_without_receivers_does_not_panic() {
        let sink = BroadcastEventSink::new(1);
        sink.emit(SyncEvent::Cleared { count: 3 });
        NoopEventSink.emit(SyncEvent::Cleared { count: 3 });
    }
}
