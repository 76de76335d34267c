//! Queue module: the sync queue manager, retry policy and change listeners.

mod manager;
mod retry;
mod subscribers;

pub use manager::{SyncQueue, SyncQueueBuilder};
pub use retry::RetryPolicy;
pub use subscribers::Subscription;
