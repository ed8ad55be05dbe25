//! Subscriptions and the builder that configures them.
//!
//! Every subscribe shape (plain, filtered, mapped, filter-mapped) compiles
//! down to a single erased pipeline per subscription:
//!
//! ```text
//! deliver(e) = predicates(e) && transform(e).map(handler)
//! ```
//!
//! Predicates run in the order they were added and before the transform.
//! A transform returning `None` drops the event. Pipelines are private to
//! their subscription and never observe each other.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;
use uuid::Uuid;

use crate::center::NotificationCenter;
use crate::event::{Envelope, EventTypeId, Notification, Sender};
use crate::scheduler::Scheduler;
use crate::token::NotificationToken;

type Predicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
type Transform<E, V> = Box<dyn Fn(&E) -> Option<V> + Send + Sync>;
pub(crate) type Pipeline = Box<dyn Fn(&Envelope) + Send + Sync>;

/// Identity of one registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    id: Uuid,
    event_type: EventTypeId,
}

impl SubscriptionId {
    fn new(event_type: EventTypeId) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
        }
    }

    /// The event type this subscription listens for.
    #[must_use]
    pub fn event_type(&self) -> EventTypeId {
        self.event_type
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event_type, self.id)
    }
}

/// A registered interest in one event type. Immutable once registered.
pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) name: String,
    pub(crate) sender: Option<Sender>,
    pub(crate) scheduler: Option<Arc<dyn Scheduler>>,
    pipeline: Pipeline,
    active: Arc<AtomicBool>,
}

impl Subscription {
    /// Run the pipeline against an envelope.
    pub(crate) fn deliver(&self, envelope: &Envelope) {
        (self.pipeline)(envelope);
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub(crate) fn active_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.active)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("sender", &self.sender)
            .field("scheduled", &self.scheduler.is_some())
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Options shared by every builder stage.
struct Parts<E> {
    name: Option<String>,
    sender: Option<Sender>,
    scheduler: Option<Arc<dyn Scheduler>>,
    predicates: Vec<Predicate<E>>,
}

impl<E: Notification> Parts<E> {
    fn new() -> Self {
        Self {
            name: None,
            sender: None,
            scheduler: None,
            predicates: Vec::new(),
        }
    }

    fn build<F>(self, deliver: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let event_type = EventTypeId::of::<E>();
        let name = self.name.unwrap_or_else(|| "anonymous".to_string());
        let predicates = self.predicates;

        let pipeline_name = name.clone();
        let pipeline: Pipeline = Box::new(move |envelope: &Envelope| {
            let Some(event) = envelope.downcast::<E>() else {
                warn!(
                    subscription_name = %pipeline_name,
                    event_type = %event_type,
                    "Payload type does not match subscription, event type ids collide"
                );
                return;
            };
            if predicates.iter().all(|accepts| accepts(event)) {
                deliver(event);
            }
        });

        Subscription {
            id: SubscriptionId::new(event_type),
            name,
            sender: self.sender,
            scheduler: self.scheduler,
            pipeline,
            active: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// Builder for a subscription delivering the event itself.
///
/// Obtained from [`NotificationCenter::observe`].
#[must_use = "a subscription is only registered by `subscribe` or `register`"]
pub struct Observe<'c, E: Notification> {
    center: &'c NotificationCenter,
    parts: Parts<E>,
}

impl<'c, E: Notification> Observe<'c, E> {
    pub(crate) fn new(center: &'c NotificationCenter) -> Self {
        Self {
            center,
            parts: Parts::new(),
        }
    }

    /// Only match posts from this sender.
    pub fn sent_by(mut self, sender: Sender) -> Self {
        self.parts.sender = Some(sender);
        self
    }

    /// Drop events for which the predicate returns `false`.
    ///
    /// Repeated calls combine with logical AND, evaluated in order.
    pub fn filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.parts.predicates.push(Box::new(predicate));
        self
    }

    /// Deliver on the given scheduler instead of the posting thread.
    pub fn on(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.parts.scheduler = Some(scheduler);
        self
    }

    /// Name used in log output.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.parts.name = Some(name.into());
        self
    }

    /// Deliver `transform(event)` instead of the event.
    pub fn map<V, T>(self, transform: T) -> Mapped<'c, E, V>
    where
        V: 'static,
        T: Fn(&E) -> V + Send + Sync + 'static,
    {
        self.filter_map(move |event| Some(transform(event)))
    }

    /// Deliver `transform(event)` when it returns `Some`, drop the event otherwise.
    pub fn filter_map<V, T>(self, transform: T) -> Mapped<'c, E, V>
    where
        V: 'static,
        T: Fn(&E) -> Option<V> + Send + Sync + 'static,
    {
        Mapped {
            center: self.center,
            parts: self.parts,
            transform: Box::new(transform),
            _output: PhantomData,
        }
    }

    /// Register the handler and return a token that deregisters on drop.
    pub fn subscribe<H>(self, handler: H) -> NotificationToken
    where
        H: Fn(&E) + Send + Sync + 'static,
    {
        let center = self.center;
        center.attach(self.parts.build(handler))
    }

    /// Register the handler without a token.
    ///
    /// The subscription stays until [`NotificationCenter::remove`] is called
    /// with the returned id, or the center is dropped.
    pub fn register<H>(self, handler: H) -> SubscriptionId
    where
        H: Fn(&E) + Send + Sync + 'static,
    {
        let center = self.center;
        center.insert(self.parts.build(handler)).0
    }
}

/// Builder for a subscription delivering a transformed value.
///
/// Obtained from [`Observe::map`] or [`Observe::filter_map`].
#[must_use = "a subscription is only registered by `subscribe` or `register`"]
pub struct Mapped<'c, E: Notification, V> {
    center: &'c NotificationCenter,
    parts: Parts<E>,
    transform: Transform<E, V>,
    _output: PhantomData<fn() -> V>,
}

impl<E: Notification, V: 'static> Mapped<'_, E, V> {
    /// Only match posts from this sender.
    pub fn sent_by(mut self, sender: Sender) -> Self {
        self.parts.sender = Some(sender);
        self
    }

    /// Deliver on the given scheduler instead of the posting thread.
    pub fn on(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.parts.scheduler = Some(scheduler);
        self
    }

    /// Name used in log output.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.parts.name = Some(name.into());
        self
    }

    /// Register the handler and return a token that deregisters on drop.
    pub fn subscribe<H>(self, handler: H) -> NotificationToken
    where
        H: Fn(V) + Send + Sync + 'static,
    {
        let center = self.center;
        center.attach(self.into_subscription(handler))
    }

    /// Register the handler without a token.
    pub fn register<H>(self, handler: H) -> SubscriptionId
    where
        H: Fn(V) + Send + Sync + 'static,
    {
        let center = self.center;
        center.insert(self.into_subscription(handler)).0
    }

    fn into_subscription<H>(self, handler: H) -> Subscription
    where
        H: Fn(V) + Send + Sync + 'static,
    {
        let transform = self.transform;
        self.parts.build(move |event: &E| {
            if let Some(value) = transform(event) {
                handler(value);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Reading {
        celsius: i32,
    }

    impl Notification for Reading {
        const EVENT_TYPE: &'static str = "reading";
    }

    struct Impostor;

    impl Notification for Impostor {
        const EVENT_TYPE: &'static str = "reading";
    }

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, impl Fn(i32) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v: i32| sink.lock().unwrap().push(v))
    }

    #[test]
    fn test_predicates_and_in_order() {
        let (seen, record) = recorder();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&calls);
        let second = Arc::clone(&calls);

        let mut parts = Parts::<Reading>::new();
        parts.predicates.push(Box::new(move |r: &Reading| {
            first.lock().unwrap().push("positive");
            r.celsius > 0
        }));
        parts.predicates.push(Box::new(move |r: &Reading| {
            second.lock().unwrap().push("small");
            r.celsius < 100
        }));
        let sub = parts.build(move |r: &Reading| record(r.celsius));

        sub.deliver(&Envelope::new(Reading { celsius: 20 }, None));
        sub.deliver(&Envelope::new(Reading { celsius: -5 }, None));
        sub.deliver(&Envelope::new(Reading { celsius: 150 }, None));

        assert_eq!(*seen.lock().unwrap(), vec![20]);
        // The second predicate is short-circuited for -5.
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["positive", "small", "positive", "positive", "small"]
        );
    }

    #[test]
    fn test_mismatched_payload_is_skipped() {
        let (seen, record) = recorder();
        let sub = Parts::<Reading>::new().build(move |r: &Reading| record(r.celsius));

        sub.deliver(&Envelope::new(Impostor, None));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_subscription_defaults() {
        let sub = Parts::<Reading>::new().build(|_| {});
        assert_eq!(sub.name, "anonymous");
        assert_eq!(sub.id.event_type().as_str(), "reading");
        assert!(sub.sender.is_none());
        assert!(sub.scheduler.is_none());
        assert!(sub.is_active());

        sub.deactivate();
        assert!(!sub.is_active());
        assert!(!sub.active_flag().load(Ordering::Acquire));
    }

    #[test]
    fn test_subscription_ids_are_unique() {
        let a = SubscriptionId::new(EventTypeId::of::<Reading>());
        let b = SubscriptionId::new(EventTypeId::of::<Reading>());
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("reading/"));
    }
}
