//! Blocking and async waits on notifications.
//!
//! An [`Expectation`] is a single subscription that counts matching events
//! and lets a test wait, with a timeout, until enough of them have arrived.
//! It only uses the center's public subscribe API and deregisters when
//! dropped.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use tidings_events::{Notification, NotificationCenter, NotificationToken, Sender};
use tokio::sync::Notify;
use tracing::trace;

#[derive(Default)]
struct Fulfillment {
    count: Mutex<usize>,
    changed: Condvar,
    notify: Notify,
}

impl Fulfillment {
    fn count(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fulfill(&self) {
        {
            let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
            *count = count.saturating_add(1);
        }
        self.changed.notify_all();
        self.notify.notify_waiters();
    }
}

/// Waits for notifications of one event type.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tidings_events::NotificationCenter;
/// use tidings_test::{Expectation, TestEvent};
///
/// let center = NotificationCenter::new();
/// let never = Expectation::matching(&center, |e: &TestEvent| e.value == "never").inverted();
///
/// center.post(TestEvent::new("something else"));
/// assert!(never.wait(Duration::from_millis(20)));
/// ```
#[must_use = "an expectation only observes while it is alive"]
pub struct Expectation {
    state: Arc<Fulfillment>,
    expected: usize,
    inverted: bool,
    _token: NotificationToken,
}

impl Expectation {
    /// Expect any event of type `E`.
    pub fn new<E: Notification>(center: &NotificationCenter) -> Self {
        Self::matching(center, |_: &E| true)
    }

    /// Expect an event of type `E` for which `matcher` returns `true`.
    pub fn matching<E, F>(center: &NotificationCenter, matcher: F) -> Self
    where
        E: Notification,
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::observe(center, None, matcher)
    }

    /// Expect a matching event of type `E` posted by `sender`.
    pub fn from_sender<E, F>(center: &NotificationCenter, sender: Sender, matcher: F) -> Self
    where
        E: Notification,
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::observe(center, Some(sender), matcher)
    }

    fn observe<E, F>(center: &NotificationCenter, sender: Option<Sender>, matcher: F) -> Self
    where
        E: Notification,
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let state = Arc::new(Fulfillment::default());
        let handler_state = Arc::clone(&state);

        let mut observe = center
            .observe::<E>()
            .named(format!("expectation:{}", E::EVENT_TYPE))
            .filter(matcher);
        if let Some(sender) = sender {
            observe = observe.sent_by(sender);
        }
        let token = observe.subscribe(move |_| {
            handler_state.fulfill();
            trace!(event_type = E::EVENT_TYPE, "Expectation fulfilled once");
        });

        Self {
            state,
            expected: 1,
            inverted: false,
            _token: token,
        }
    }

    /// Require `count` matching events instead of one. Zero is treated as one.
    pub fn with_expected_count(mut self, count: usize) -> Self {
        self.expected = count.max(1);
        self
    }

    /// Succeed only if the expected events do *not* arrive before the timeout.
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    /// Number of matching events seen so far.
    #[must_use]
    pub fn fulfillment_count(&self) -> usize {
        self.state.count()
    }

    /// Whether the expected number of events has arrived.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.fulfillment_count() >= self.expected
    }

    /// Block the current thread until the expectation is met or `timeout`
    /// elapses. Returns `true` on success (for inverted expectations:
    /// nothing arrived).
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self
            .state
            .count
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .state
            .changed
            .wait_timeout_while(guard, timeout, |count| *count < self.expected)
            .unwrap_or_else(PoisonError::into_inner);
        let fulfilled = *guard >= self.expected;
        fulfilled != self.inverted
    }

    /// Asynchronous version of [`wait`](Self::wait).
    pub async fn wait_async(&self, timeout: Duration) -> bool {
        let state = &self.state;
        let expected = self.expected;
        let reached = async {
            loop {
                let notified = state.notify.notified();
                if state.count() >= expected {
                    return;
                }
                notified.await;
            }
        };
        let fulfilled = tokio::time::timeout(timeout, reached).await.is_ok();
        fulfilled != self.inverted
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("expected", &self.expected)
            .field("fulfilled", &self.fulfillment_count())
            .field("inverted", &self.inverted)
            .finish_non_exhaustive()
    }
}
