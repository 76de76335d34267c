//! Change listeners.
//!
//! Design:
//! - Listeners get a full snapshot of the queue, not a diff.
//! - The table lock is never held while a listener runs, so a listener may
//!   subscribe/unsubscribe without deadlocking.
//! - Listeners run while the queue lock is held and must return quickly.
//! - A panicking listener is isolated: it is logged and the rest still run.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::domain::QueuedRequest;

type Listener = Arc<dyn Fn(&[QueuedRequest]) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

#[derive(Clone, Default)]
pub(crate) struct Listeners {
    table: Arc<Mutex<ListenerTable>>,
}

impl Listeners {
    pub(crate) fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[QueuedRequest]) + Send + Sync + 'static,
    {
        let mut table = lock(&self.table);
        let id = table.next_id;
        table.next_id += 1;
        table.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.table).entries.len()
    }

    pub(crate) fn notify(&self, snapshot: &[QueuedRequest]) {
        let entries: Vec<(u64, Listener)> = lock(&self.table).entries.clone();
        for (id, listener) in entries {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(snapshot))) {
                tracing::error!(
                    listener = id,
                    panic = panic_message(&*panic),
                    "sync queue listener panicked"
                );
            }
        }
    }
}

fn lock(table: &Mutex<ListenerTable>) -> MutexGuard<'_, ListenerTable> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle returned by `SyncQueue::subscribe`.
///
/// Dropping it (or calling `unsubscribe`) removes the listener.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    table: Weak<Mutex<ListenerTable>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            lock(&table).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(listeners: &Listeners) -> (Arc<AtomicUsize>, Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let sub = listeners.subscribe({
            let count = count.clone();
            move |_snapshot: &[QueuedRequest]| {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });
        (count, sub)
    }

    #[test]
    fn every_subscriber_is_notified() {
        let listeners = Listeners::default();
        let (a, _sub_a) = counter(&listeners);
        let (b, _sub_b) = counter(&listeners);

        listeners.notify(&[]);

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let listeners = Listeners::default();
        let (a, sub_a) = counter(&listeners);
        let (b, _sub_b) = counter(&listeners);

        sub_a.unsubscribe();
        listeners.notify(&[]);

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn panicking_listener_does_not_stop_others() {
        let listeners = Listeners::default();
        let _bad = listeners.subscribe(|_: &[QueuedRequest]| panic!("listener bug"));
        let (good, _sub) = counter(&listeners);

        listeners.notify(&[]);
        listeners.notify(&[]);

        assert_eq!(good.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listener_may_unsubscribe_during_notify() {
        let listeners = Listeners::default();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let sub = listeners.subscribe({
            let slot = slot.clone();
            move |_: &[QueuedRequest]| {
                slot.lock().unwrap().take();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        listeners.notify(&[]);
        assert_eq!(listeners.len(), 0);
    }

    #[test]
    fn subscription_outliving_table_is_harmless() {
        let listeners = Listeners::default();
        let (_count, sub) = counter(&listeners);
        drop(listeners);
        drop(sub);
    }
}
