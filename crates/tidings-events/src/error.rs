//! Event center error types.

use thiserror::Error;

/// Errors raised while setting up or feeding delivery schedulers.
///
/// Dispatch itself never fails; these only surface from scheduler
/// construction and from enqueueing onto a queue that has shut down.
#[derive(Debug, Error)]
pub enum EventsError {
    /// A tokio-backed queue was requested outside of a runtime.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    /// The queue's worker has stopped and can no longer accept jobs.
    #[error("delivery queue '{name}' is closed")]
    QueueClosed {
        /// Name of the closed queue.
        name: String,
    },
}

/// Result type for event center operations.
pub type EventsResult<T> = Result<T, EventsError>;
