//! Domain model (ids, queued requests, errors, events, reports).

pub mod errors;
pub mod events;
pub mod ids;
pub mod report;
pub mod request;

pub use self::errors::{DispatchError, StoreError};
pub use self::events::SyncEvent;
pub use self::ids::{ParseRequestIdError, RequestId};
pub use self::report::{PassOutcome, SyncReport};
pub use self::request::{
    EnqueueOptions, HttpMethod, ParseMethodError, QueuedRequest, RequestMetadata,
};
