//! SyncQueue: the offline request queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::RetryPolicy;
use super::subscribers::{Listeners, Subscription};
use crate::config::SyncConfig;
use crate::domain::{
    DispatchError, EnqueueOptions, HttpMethod, PassOutcome, QueuedRequest, RequestId, SyncEvent,
    SyncReport,
};
use crate::impls::NoopEventSink;
use crate::observability::SyncStatus;
use crate::ports::{Clock, Dispatcher, EventSink, IdGenerator, QueueStore, SystemClock, UlidGenerator};

/// Wires the collaborators of a `SyncQueue`.
///
/// # 使用例
/// ```ignore
/// let queue = SyncQueueBuilder::new(store, dispatcher)
///     .config(SyncConfig::default())
///     .open()
///     .await;
/// ```
pub struct SyncQueueBuilder {
    store: Arc<dyn QueueStore>,
    dispatcher: Arc<dyn Dispatcher>,
    config: SyncConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    events: Option<Arc<dyn EventSink>>,
}

impl SyncQueueBuilder {
    pub fn new(store: Arc<dyn QueueStore>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            config: SyncConfig::default(),
            clock: None,
            ids: None,
            events: None,
        }
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the queue and restore whatever the store holds.
    ///
    /// A failing store yields an empty queue (logged), not an error.
    pub async fn open(self) -> SyncQueue {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));

        let restored = match self.store.load().await {
            Ok(queue) => queue,
            Err(e) => {
                error!(error = %e, "failed to load sync queue, starting empty");
                Vec::new()
            }
        };
        if !restored.is_empty() {
            info!(pending = restored.len(), "restored sync queue");
        }

        SyncQueue {
            retry_policy: self.config.retry_policy(),
            config: self.config,
            queue: Mutex::new(restored),
            processing: AtomicBool::new(false),
            last_sync_at: Mutex::new(None),
            store: self.store,
            dispatcher: self.dispatcher,
            clock,
            ids,
            events: self.events.unwrap_or_else(|| Arc::new(NoopEventSink)),
            listeners: Listeners::default(),
        }
    }
}

/// Offline request queue.
///
/// Design:
/// - `queue` is the only copy of the pending requests; callers get clones.
/// - A mutation, the persistence write and the listener notification that
///   follow it happen under the same lock, so writes and snapshots land in
///   mutation order.
/// - The lock is never held across a dispatch call.
/// - `processing` makes `process_queue` single-flight.
pub struct SyncQueue {
    config: SyncConfig,
    retry_policy: RetryPolicy,
    queue: Mutex<Vec<QueuedRequest>>,
    processing: AtomicBool,
    last_sync_at: Mutex<Option<DateTime<Utc>>>,
    store: Arc<dyn QueueStore>,
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    events: Arc<dyn EventSink>,
    listeners: Listeners,
}

/// Releases the processing flag, also on unwind.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncQueue {
    pub fn builder(store: Arc<dyn QueueStore>, dispatcher: Arc<dyn Dispatcher>) -> SyncQueueBuilder {
        SyncQueueBuilder::new(store, dispatcher)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Queue a mutation for delivery and return its id.
    ///
    /// Never fails: if the store cannot be written the request still sits in
    /// memory and the error is logged.
    pub async fn add_to_queue(
        &self,
        url: impl Into<String>,
        method: HttpMethod,
        data: Option<serde_json::Value>,
        options: EnqueueOptions,
    ) -> RequestId {
        let mut request = QueuedRequest::new(
            self.ids.generate_request_id(),
            url.into(),
            method,
            data,
            self.clock.now(),
            options.max_retries.unwrap_or(self.config.max_retries),
        );
        request.headers = options.headers;
        request.metadata = options.metadata;
        let id = request.id;

        debug!(%id, %method, url = %request.url, "enqueue");
        self.mutate(|queue| {
            queue.push(request);
            true
        })
        .await;

        self.events.emit(SyncEvent::Enqueued { id });
        id
    }

    /// Run one delivery pass over a snapshot of the queue.
    ///
    /// Requests are dispatched one at a time, in insertion order. Never fails;
    /// per-request outcomes are reported through the returned `SyncReport`,
    /// `SyncEvent`s and logs.
    pub async fn process_queue(&self) -> SyncReport {
        let Some(_guard) = ProcessingGuard::acquire(&self.processing) else {
            debug!("sync pass already running, skipping");
            return SyncReport::new(PassOutcome::AlreadyRunning);
        };

        let snapshot = self.queue.lock().await.clone();
        if snapshot.is_empty() {
            return SyncReport::new(PassOutcome::Empty);
        }

        info!(pending = snapshot.len(), "sync pass started");
        let mut report = SyncReport::new(PassOutcome::Completed);

        for request in &snapshot {
            match self.dispatcher.request(&request.to_dispatch()).await {
                Ok(()) => self.on_delivered(request.id, &mut report).await,
                Err(e) => self.on_failed(request.id, e, &mut report).await,
            }
        }

        let remaining = {
            let queue = self.queue.lock().await;
            self.persist(&queue).await;
            self.listeners.notify(&queue);
            queue.len()
        };
        *self.last_sync_at.lock().await = Some(self.clock.now());

        info!(
            delivered = report.delivered.len(),
            retried = report.retried.len(),
            dropped = report.dropped.len(),
            remaining,
            "sync pass finished"
        );
        report
    }

    async fn on_delivered(&self, id: RequestId, report: &mut SyncReport) {
        {
            let mut queue = self.queue.lock().await;
            if let Some(pos) = queue.iter().position(|r| r.id == id) {
                queue.remove(pos);
            }
        }
        debug!(%id, "delivered");
        report.delivered.push(id);
        self.events.emit(SyncEvent::Delivered { id });
    }

    async fn on_failed(&self, id: RequestId, err: DispatchError, report: &mut SyncReport) {
        let error = err.to_string();
        let mut queue = self.queue.lock().await;
        let Some(pos) = queue.iter().position(|r| r.id == id) else {
            // removed or cleared while in flight
            debug!(%id, %error, "delivery failed for a request no longer queued");
            return;
        };

        let request = &mut queue[pos];
        let retry_count = request.record_failure(error.clone());
        let max_retries = request.max_retries;

        if request.is_exhausted() {
            queue.remove(pos);
            drop(queue);
            warn!(%id, retry_count, %error, "retry limit reached, dropping request");
            report.dropped.push(id);
            self.events.emit(SyncEvent::Dropped {
                id,
                retry_count,
                error,
            });
        } else {
            drop(queue);
            let suggested_delay = self.retry_policy.next_delay(retry_count);
            info!(
                %id,
                retry_count,
                max_retries,
                delay_ms = suggested_delay.as_millis() as u64,
                %error,
                "delivery failed, will retry"
            );
            report.record_retry(id, suggested_delay);
            self.events.emit(SyncEvent::RetryScheduled {
                id,
                retry_count,
                max_retries,
                suggested_delay,
                error,
            });
        }
    }

    /// Remove a request regardless of its retry state.
    pub async fn remove_request(&self, id: RequestId) -> bool {
        let found = self
            .mutate(|queue| match queue.iter().position(|r| r.id == id) {
                Some(pos) => {
                    queue.remove(pos);
                    true
                }
                None => false,
            })
            .await;

        if found {
            debug!(%id, "removed");
            self.events.emit(SyncEvent::Removed { id });
        }
        found
    }

    /// Drop every pending request and persist the empty queue.
    pub async fn clear_queue(&self) {
        let mut count = 0;
        self.mutate(|queue| {
            count = queue.len();
            queue.clear();
            true
        })
        .await;

        info!(count, "sync queue cleared");
        self.events.emit(SyncEvent::Cleared { count });
    }

    pub async fn get_queue(&self) -> Vec<QueuedRequest> {
        self.queue.lock().await.clone()
    }

    pub async fn get_queue_size(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn has_pending_requests(&self) -> bool {
        !self.queue.lock().await.is_empty()
    }

    /// Requests that failed at least once and are still queued.
    pub async fn get_failed_requests(&self) -> Vec<QueuedRequest> {
        self.queue
            .lock()
            .await
            .iter()
            .filter(|r| r.has_failed())
            .cloned()
            .collect()
    }

    pub async fn get_requests_by_metadata(
        &self,
        entity_type: &str,
        entity_id: Option<&str>,
    ) -> Vec<QueuedRequest> {
        self.queue
            .lock()
            .await
            .iter()
            .filter(|r| r.matches_entity(entity_type, entity_id))
            .cloned()
            .collect()
    }

    pub async fn status(&self) -> SyncStatus {
        let (pending, failed) = {
            let queue = self.queue.lock().await;
            (queue.len(), queue.iter().filter(|r| r.has_failed()).count())
        };
        SyncStatus {
            pending,
            failed,
            in_progress: self.processing.load(Ordering::Acquire),
            last_sync_at: *self.last_sync_at.lock().await,
        }
    }

    /// Register a listener that receives a full snapshot after every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[QueuedRequest]) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    /// Apply `f`; if it reports a change, persist and notify listeners
    /// while still holding the lock so both see changes in queue order.
    async fn mutate<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut Vec<QueuedRequest>) -> bool,
    {
        let mut queue = self.queue.lock().await;
        let changed = f(&mut queue);
        if changed {
            self.persist(&queue).await;
            self.listeners.notify(&queue);
        }
        changed
    }

    async fn persist(&self, snapshot: &[QueuedRequest]) {
        if let Err(e) = self.store.save(snapshot).await {
            error!(
                error = %e,
                key = %self.config.storage_key,
                pending = snapshot.len(),
                "failed to persist sync queue"
            );
        }
    }
}
