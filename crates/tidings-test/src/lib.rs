//! Tidings Test - Shared test utilities for the tidings notification center.
//!
//! This crate provides an expectation adapter for waiting on notifications,
//! ready-made event fixtures and a test logging harness. Add it as a
//! dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! tidings-test.workspace = true
//! ```
//!
//! ```rust
//! use std::time::Duration;
//! use tidings_events::NotificationCenter;
//! use tidings_test::{Expectation, TestEvent};
//!
//! let center = NotificationCenter::new();
//! let expectation = Expectation::matching(&center, |e: &TestEvent| e.value == "foobar");
//!
//! center.post(TestEvent::new("foobar"));
//! assert!(expectation.wait(Duration::from_millis(100)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod expectation;
pub mod fixtures;
pub mod harness;

pub use expectation::*;
pub use fixtures::*;
pub use harness::*;
