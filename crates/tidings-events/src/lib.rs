//! Tidings Events - Typed publish/subscribe notification center.
//!
//! This crate provides:
//! - Compile-time event identity via the [`Notification`] trait
//! - A [`NotificationCenter`] that routes posted events to subscriptions in
//!   registration order
//! - Per-subscription sender scoping, predicate filters and transforms
//! - Tokens that deregister their subscription when dropped
//! - Optional delivery on a [`Scheduler`] instead of the posting thread
//!
//! # Architecture
//!
//! Subscriptions are kept per event type, in registration order. `post`
//! takes a snapshot of the matching subscriptions, releases the registry,
//! and runs each subscription's pipeline (sender check, predicates,
//! transform, handler). Subscriptions added during a pass are not part of
//! that pass; subscriptions removed during a pass are skipped.
//!
//! # Example
//!
//! ```rust
//! use tidings_events::{Notification, NotificationCenter, Sender};
//!
//! struct Test {
//!     value: String,
//! }
//!
//! impl Notification for Test {
//!     const EVENT_TYPE: &'static str = "test";
//! }
//!
//! let center = NotificationCenter::new();
//! let editor = Sender::unique();
//!
//! // Only "keep" values, and only from the editor.
//! let token = center
//!     .observe::<Test>()
//!     .sent_by(editor)
//!     .filter_map(|e| (e.value == "keep").then(|| e.value.clone()))
//!     .subscribe(|value| assert_eq!(value, "keep"));
//!
//! center.post_from(Test { value: "keep".into() }, &editor);
//! center.post_from(Test { value: "drop".into() }, &editor);
//! center.post(Test { value: "keep".into() });
//!
//! // Dropping the token deregisters the subscription.
//! drop(token);
//! assert_eq!(center.subscriber_count(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod center;
mod error;
mod event;
mod scheduler;
mod subscription;
mod token;

pub use center::{CenterOptions, NotificationCenter, PanicPolicy};
pub use error::{EventsError, EventsResult};
pub use event::{Envelope, EventTypeId, Notification, Sender};
pub use scheduler::{Job, LocalQueue, Scheduler, SerialQueue};
pub use subscription::{Mapped, Observe, SubscriptionId};
pub use token::{NotificationToken, TokenBag};
