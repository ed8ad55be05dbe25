//! Subscription lifetime handles.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::center::Registry;
use crate::subscription::SubscriptionId;

/// Owned handle to a subscription. Dropping it deregisters the subscription.
///
/// A token moves from active to deregistered exactly once, through
/// [`cancel`](Self::cancel), [`NotificationCenter::unsubscribe`], or drop.
/// Anything done with a deregistered token is a no-op. The token only holds
/// a weak reference to the center, so a token outliving its center is
/// harmless.
///
/// [`NotificationCenter::unsubscribe`]: crate::NotificationCenter::unsubscribe
#[must_use = "dropping the token immediately deregisters the subscription"]
pub struct NotificationToken {
    id: SubscriptionId,
    active: Arc<AtomicBool>,
    registry: Weak<Registry>,
}

impl NotificationToken {
    pub(crate) fn new(id: SubscriptionId, active: Arc<AtomicBool>, registry: Weak<Registry>) -> Self {
        Self {
            id,
            active,
            registry,
        }
    }

    /// The subscription this token controls.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the subscription is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.registry.strong_count() > 0
    }

    /// Deregister the subscription now instead of at drop.
    pub fn cancel(&mut self) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
        self.active.store(false, Ordering::Release);
    }

    /// Move the token into a bag that owns its lifetime.
    pub fn store_in(self, bag: &mut TokenBag) {
        bag.insert(self);
    }
}

impl Drop for NotificationToken {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for NotificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationToken")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// A set of tokens deregistered together when the bag is cleared or dropped.
#[derive(Debug, Default)]
pub struct TokenBag {
    tokens: Vec<NotificationToken>,
}

impl TokenBag {
    /// Create an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a token.
    pub fn insert(&mut self, token: NotificationToken) {
        self.tokens.push(token);
    }

    /// Number of tokens held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the bag holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Deregister and release every token held.
    pub fn clear(&mut self) {
        self.tokens.clear();
    }
}

impl Extend<NotificationToken> for TokenBag {
    fn extend<I: IntoIterator<Item = NotificationToken>>(&mut self, iter: I) {
        self.tokens.extend(iter);
    }
}

impl FromIterator<NotificationToken> for TokenBag {
    fn from_iter<I: IntoIterator<Item = NotificationToken>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::center::NotificationCenter;
    use crate::event::Notification;
    use std::sync::atomic::AtomicUsize;

    struct Tick;

    impl Notification for Tick {
        const EVENT_TYPE: &'static str = "tick";
    }

    fn counting(center: &NotificationCenter, hits: &Arc<AtomicUsize>) -> NotificationToken {
        let hits = Arc::clone(hits);
        center.subscribe(move |_: &Tick| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_drop_deregisters() {
        let center = NotificationCenter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let token = counting(&center, &hits);
        assert!(token.is_active());
        center.post(Tick);
        drop(token);
        center.post(Tick);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(center.subscriber_count(), 0);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let center = NotificationCenter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let _other = counting(&center, &hits);

        let mut token = counting(&center, &hits);
        token.cancel();
        assert!(!token.is_active());
        assert_eq!(center.subscriber_count(), 1);

        token.cancel();
        assert_eq!(center.subscriber_count(), 1);
        drop(token);
        assert_eq!(center.subscriber_count(), 1);
    }

    #[test]
    fn test_token_outlives_center() {
        let center = NotificationCenter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut token = counting(&center, &hits);

        drop(center);
        assert!(!token.is_active());
        token.cancel();
    }

    #[test]
    fn test_bag_releases_all_tokens() {
        let center = NotificationCenter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let mut bag = TokenBag::new();
        counting(&center, &hits).store_in(&mut bag);
        bag.extend([counting(&center, &hits), counting(&center, &hits)]);
        assert_eq!(bag.len(), 3);

        center.post(Tick);
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        bag.clear();
        assert!(bag.is_empty());
        center.post(Tick);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(center.subscriber_count(), 0);
    }

    #[test]
    fn test_bag_drop_releases_tokens() {
        let center = NotificationCenter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let bag: TokenBag = (0..4).map(|_| counting(&center, &hits)).collect();
        assert_eq!(center.subscriber_count(), 4);
        drop(bag);
        assert_eq!(center.subscriber_count(), 0);
    }
}
