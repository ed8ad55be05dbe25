//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tidings_events::prelude::*;` to import all essential types.

// Center
pub use crate::{CenterOptions, NotificationCenter, PanicPolicy};

// Events
pub use crate::{EventTypeId, Notification, Sender};

// Subscriptions
pub use crate::{NotificationToken, SubscriptionId, TokenBag};

// Scheduling
pub use crate::{LocalQueue, Scheduler, SerialQueue};
