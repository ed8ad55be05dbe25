//! The notification center: subscription registry and dispatcher.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use crate::event::{Envelope, EventTypeId, Notification, Sender};
use crate::subscription::{Observe, Subscription, SubscriptionId};
use crate::token::NotificationToken;

/// What happens when a predicate, transform or handler panics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PanicPolicy {
    /// Catch the panic, log it, and keep notifying the remaining subscribers.
    #[default]
    Isolate,
    /// Let the panic unwind out of `post` (or out of the scheduler job).
    /// Subscribers after the failing one in the same pass are not notified.
    Propagate,
}

/// Construction options for a [`NotificationCenter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CenterOptions {
    /// Name used in log output.
    pub name: String,
    /// Handler failure policy.
    pub panic_policy: PanicPolicy,
}

impl Default for CenterOptions {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            panic_policy: PanicPolicy::default(),
        }
    }
}

impl CenterOptions {
    /// Options with the given center name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the handler failure policy.
    #[must_use]
    pub fn with_panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.panic_policy = policy;
        self
    }
}

#[cfg(feature = "config")]
impl From<&tidings_config::DispatchSection> for CenterOptions {
    fn from(section: &tidings_config::DispatchSection) -> Self {
        let panic_policy = match section.panic_policy.as_str() {
            "propagate" => PanicPolicy::Propagate,
            _ => PanicPolicy::Isolate,
        };
        Self {
            name: section.name.clone(),
            panic_policy,
        }
    }
}

/// Shared state behind every clone of a center.
///
/// Each event type owns an ordered list of subscriptions; list order is
/// delivery order. A list is locked only to append, remove, or take a
/// snapshot, never while a callback runs.
pub(crate) struct Registry {
    slots: DashMap<EventTypeId, Vec<Arc<Subscription>>>,
    options: CenterOptions,
    // Shared with scheduled jobs for their log lines.
    name: Arc<str>,
}

impl Registry {
    fn insert(&self, subscription: Subscription) -> Arc<Subscription> {
        let subscription = Arc::new(subscription);
        self.slots
            .entry(subscription.id.event_type())
            .or_default()
            .push(Arc::clone(&subscription));

        debug!(
            center = %self.options.name,
            subscription_name = %subscription.name,
            subscription_id = %subscription.id,
            "Subscription registered"
        );
        subscription
    }

    /// Remove a subscription. Returns `true` if it was registered.
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.slots.get_mut(&id.event_type()).and_then(|mut slot| {
            let index = slot.iter().position(|s| s.id == id)?;
            Some(slot.remove(index))
        });
        self.slots
            .remove_if(&id.event_type(), |_, slot| slot.is_empty());

        // The slot lock is released before the subscription can drop, so
        // captured state with its own Drop logic may safely call back in.
        let Some(subscription) = removed else {
            return false;
        };
        subscription.deactivate();
        debug!(
            center = %self.options.name,
            subscription_name = %subscription.name,
            subscription_id = %id,
            "Subscription removed"
        );
        true
    }

    fn snapshot(&self, envelope: &Envelope) -> Vec<Arc<Subscription>> {
        self.slots
            .get(&envelope.event_type())
            .map(|slot| {
                slot.iter()
                    .filter(|s| envelope.matches_sender(s.sender))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.slots
            .iter()
            .fold(0_usize, |total, slot| total.saturating_add(slot.len()))
    }

    fn len_for(&self, event_type: EventTypeId) -> usize {
        self.slots.get(&event_type).map_or(0, |slot| slot.len())
    }

    fn clear(&self) {
        let drained: Vec<Arc<Subscription>> = {
            let keys: Vec<EventTypeId> = self.slots.iter().map(|slot| *slot.key()).collect();
            keys.into_iter()
                .filter_map(|key| self.slots.remove(&key))
                .flat_map(|(_, slot)| slot)
                .collect()
        };
        for subscription in &drained {
            subscription.deactivate();
        }
        debug!(
            center = %self.options.name,
            removed = drained.len(),
            "All subscriptions cleared"
        );
    }
}

/// Run one subscription against an envelope, honoring removal and the
/// panic policy.
fn deliver(subscription: &Subscription, envelope: &Envelope, policy: PanicPolicy, center: &str) {
    // A removal that happened after the snapshot but before this point wins.
    if !subscription.is_active() {
        trace!(
            center = %center,
            subscription_id = %subscription.id,
            "Skipping removed subscription"
        );
        return;
    }

    trace!(
        center = %center,
        subscription_name = %subscription.name,
        event_type = %envelope.event_type(),
        "Notifying subscription"
    );

    match policy {
        PanicPolicy::Propagate => subscription.deliver(envelope),
        PanicPolicy::Isolate => {
            let result = catch_unwind(AssertUnwindSafe(|| subscription.deliver(envelope)));
            if let Err(payload) = result {
                warn!(
                    center = %center,
                    subscription_id = %subscription.id,
                    subscription_name = %subscription.name,
                    event_type = %envelope.event_type(),
                    error = %panic_message(payload.as_ref()),
                    "Subscription handler panicked"
                );
            }
        },
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Registry of typed subscriptions and synchronous dispatcher.
///
/// Clones share the same registry, so a center can be handed to producers
/// on other threads. There is no global instance; create one per scope that
/// needs it.
///
/// **WARNING:** storing a clone of the center inside one of its own handlers
/// creates an `Arc` cycle that keeps the registry alive. Subscriptions holding
/// a center to re-post from should be cancelled explicitly, or hold the
/// center through a channel instead.
///
/// # Example
///
/// ```rust
/// use tidings_events::{Notification, NotificationCenter};
///
/// struct Saved {
///     path: String,
/// }
///
/// impl Notification for Saved {
///     const EVENT_TYPE: &'static str = "saved";
/// }
///
/// let center = NotificationCenter::new();
/// let _token = center
///     .observe::<Saved>()
///     .filter(|e| e.path.ends_with(".toml"))
///     .map(|e| e.path.clone())
///     .subscribe(|path| println!("saved {path}"));
///
/// center.post(Saved { path: "config.toml".into() });
/// ```
#[derive(Clone)]
pub struct NotificationCenter {
    registry: Arc<Registry>,
}

impl NotificationCenter {
    /// Create a center with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(CenterOptions::default())
    }

    /// Create a center with the given options.
    #[must_use]
    pub fn with_options(options: CenterOptions) -> Self {
        Self {
            registry: Arc::new(Registry {
                slots: DashMap::new(),
                name: Arc::from(options.name.as_str()),
                options,
            }),
        }
    }

    /// The options this center was created with.
    #[must_use]
    pub fn options(&self) -> &CenterOptions {
        &self.registry.options
    }

    /// Start configuring a subscription to events of type `E`.
    pub fn observe<E: Notification>(&self) -> Observe<'_, E> {
        Observe::new(self)
    }

    /// Subscribe a plain handler to every event of type `E`.
    pub fn subscribe<E, H>(&self, handler: H) -> NotificationToken
    where
        E: Notification,
        H: Fn(&E) + Send + Sync + 'static,
    {
        self.observe::<E>().subscribe(handler)
    }

    /// Post an event without a sender.
    ///
    /// Sender-scoped subscriptions never match anonymous posts. Returns the
    /// number of subscriptions the event was handed to.
    pub fn post<E: Notification>(&self, event: E) -> usize {
        self.dispatch(&Envelope::new(event, None))
    }

    /// Post an event on behalf of `sender`.
    ///
    /// Returns the number of subscriptions the event was handed to.
    pub fn post_from<E: Notification>(&self, event: E, sender: &Sender) -> usize {
        self.dispatch(&Envelope::new(event, Some(*sender)))
    }

    /// Deregister the subscription behind a token. Idempotent.
    pub fn unsubscribe(&self, token: &NotificationToken) {
        self.registry.remove(token.id());
    }

    /// Deregister a subscription by id.
    ///
    /// Returns `true` if the subscription was found and removed.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.registry.remove(id)
    }

    /// Number of registered subscriptions across all event types.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of registered subscriptions for event type `E`.
    #[must_use]
    pub fn subscriber_count_for<E: Notification>(&self) -> usize {
        self.registry.len_for(EventTypeId::of::<E>())
    }

    /// Whether any subscription listens for event type `E`.
    #[must_use]
    pub fn has_subscribers<E: Notification>(&self) -> bool {
        self.subscriber_count_for::<E>() > 0
    }

    /// Deregister every subscription. Outstanding tokens become inactive.
    pub fn clear(&self) {
        self.registry.clear();
    }

    pub(crate) fn insert(&self, subscription: Subscription) -> (SubscriptionId, Arc<Subscription>) {
        let subscription = self.registry.insert(subscription);
        (subscription.id, subscription)
    }

    pub(crate) fn attach(&self, subscription: Subscription) -> NotificationToken {
        let (id, subscription) = self.insert(subscription);
        NotificationToken::new(
            id,
            subscription.active_flag(),
            Arc::downgrade(&self.registry),
        )
    }

    fn dispatch(&self, envelope: &Envelope) -> usize {
        let registry = &self.registry;
        let center = &*registry.name;
        let policy = registry.options.panic_policy;

        let matched = registry.snapshot(envelope);
        if matched.is_empty() {
            trace!(center = %center, event_type = %envelope.event_type(), "No subscribers for event");
            return 0;
        }

        trace!(
            center = %center,
            event_type = %envelope.event_type(),
            subscriber_count = matched.len(),
            "Posting event"
        );

        for subscription in &matched {
            let Some(scheduler) = &subscription.scheduler else {
                deliver(subscription, envelope, policy, center);
                continue;
            };

            let job_subscription = Arc::clone(subscription);
            let job_envelope = envelope.clone();
            let job_center = Arc::clone(&registry.name);
            let result = scheduler.schedule(Box::new(move || {
                let queued = job_envelope.queued_for();
                trace!(
                    center = %job_center,
                    subscription_name = %job_subscription.name,
                    queued_us = queued.num_microseconds().unwrap_or(i64::MAX),
                    "Running scheduled delivery"
                );
                deliver(&job_subscription, &job_envelope, policy, &job_center);
            }));

            if let Err(e) = result {
                warn!(
                    center = %center,
                    subscription_name = %subscription.name,
                    scheduler = %scheduler.name(),
                    error = %e,
                    "Failed to schedule delivery"
                );
            }
        }

        matched.len()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("name", &self.registry.options.name)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
