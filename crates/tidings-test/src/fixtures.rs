//! Event fixtures and a value recorder.

use std::sync::{Arc, Mutex, PoisonError};

use tidings_events::Notification;

/// Event carrying a single string, the workhorse of most tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEvent {
    /// Payload.
    pub value: String,
}

impl TestEvent {
    /// Create an event with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl Notification for TestEvent {
    const EVENT_TYPE: &'static str = "tidings_test::test_event";
}

/// A second, unrelated event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtherEvent {
    /// Payload.
    pub n: u32,
}

impl Notification for OtherEvent {
    const EVENT_TYPE: &'static str = "tidings_test::other_event";
}

/// Collects values handed to it from any thread, in arrival order.
#[derive(Debug)]
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Send + 'static> Recorder<T> {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler that appends each value it receives.
    pub fn sink(&self) -> impl Fn(T) + Send + Sync + 'static {
        let values = Arc::clone(&self.values);
        move |value| {
            values
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(value);
        }
    }

    /// Append a value.
    pub fn record(&self, value: T) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value);
    }

    /// Number of values recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Recorder<T> {
    /// Copy of everything recorded so far.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
