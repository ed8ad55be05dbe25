//! Event identity, sender identity and the dispatch envelope.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

/// A payload type that can be posted through a
/// [`NotificationCenter`](crate::NotificationCenter).
///
/// Each implementing type declares the identifier it is routed under. The
/// identifier is the only thing the registry keys on, so two unrelated types
/// declaring the same `EVENT_TYPE` end up sharing subscribers. The center
/// does not detect this; deliveries whose payload fails to downcast are
/// skipped and logged.
///
/// # Example
///
/// ```rust
/// use tidings_events::Notification;
///
/// struct UserSignedIn {
///     user: String,
/// }
///
/// impl Notification for UserSignedIn {
///     const EVENT_TYPE: &'static str = "user_signed_in";
/// }
/// ```
pub trait Notification: Send + Sync + 'static {
    /// Stable routing identifier for this event type.
    const EVENT_TYPE: &'static str;
}

/// Stable identifier used to route posted events to subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventTypeId(&'static str);

impl EventTypeId {
    /// Resolve the identifier of a notification type.
    #[must_use]
    pub fn of<E: Notification>() -> Self {
        Self(E::EVENT_TYPE)
    }

    /// The identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EventTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SenderKind {
    Address(usize),
    Unique(Uuid),
}

/// Opaque identity of the origin of a post.
///
/// A sender is only ever compared for equality; the center never looks
/// behind it. Address-based senders are valid for as long as the referenced
/// value is alive at the same location. Zero-sized values may share an
/// address, so prefer [`Sender::unique`] for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sender(SenderKind);

impl Sender {
    /// Identity of a borrowed value, by address.
    #[must_use]
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self(SenderKind::Address(
            std::ptr::from_ref(value).cast::<()>().addr(),
        ))
    }

    /// Identity of a shared allocation. All clones of the `Arc` compare equal.
    #[must_use]
    pub fn of_arc<T: ?Sized>(value: &Arc<T>) -> Self {
        Self(SenderKind::Address(Arc::as_ptr(value).cast::<()>().addr()))
    }

    /// A fresh identity that compares equal only to its own copies.
    #[must_use]
    pub fn unique() -> Self {
        Self(SenderKind::Unique(Uuid::new_v4()))
    }
}

/// An event paired with its routing metadata for one dispatch pass.
///
/// Produced by `post` and shared with any scheduled deliveries of the same
/// pass. Nothing in the center retains it afterwards.
#[derive(Clone)]
pub struct Envelope {
    event_type: EventTypeId,
    sender: Option<Sender>,
    posted_at: DateTime<Utc>,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Envelope {
    /// Wrap an event for dispatch.
    #[must_use]
    pub fn new<E: Notification>(event: E, sender: Option<Sender>) -> Self {
        Self {
            event_type: EventTypeId::of::<E>(),
            sender,
            posted_at: Utc::now(),
            payload: Arc::new(event),
        }
    }

    /// Routing identifier of the wrapped event.
    #[must_use]
    pub fn event_type(&self) -> EventTypeId {
        self.event_type
    }

    /// The sender the event was posted from, if any.
    #[must_use]
    pub fn sender(&self) -> Option<Sender> {
        self.sender
    }

    /// When the event was posted.
    #[must_use]
    pub fn posted_at(&self) -> DateTime<Utc> {
        self.posted_at
    }

    /// Time elapsed since the post. Never negative, even if the wall clock
    /// stepped backwards in between.
    pub(crate) fn queued_for(&self) -> TimeDelta {
        Utc::now()
            .signed_duration_since(self.posted_at)
            .max(TimeDelta::zero())
    }

    /// Borrow the payload as a concrete event type.
    ///
    /// Returns `None` if the payload is some other type, which only happens
    /// when two types share an `EVENT_TYPE`.
    #[must_use]
    pub fn downcast<E: Notification>(&self) -> Option<&E> {
        self.payload.downcast_ref::<E>()
    }

    /// Whether this envelope passes a sender filter.
    pub(crate) fn matches_sender(&self, filter: Option<Sender>) -> bool {
        match filter {
            Some(wanted) => self.sender == Some(wanted),
            None => true,
        }
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("event_type", &self.event_type)
            .field("sender", &self.sender)
            .field("posted_at", &self.posted_at)
            .finish_non_exhaustive()
    }
}
