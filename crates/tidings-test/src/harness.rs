//! Test harness helpers.

use tracing_subscriber::EnvFilter;

/// Set up test logging with the given filter.
///
/// Output goes through the test writer, so it is captured per test and
/// only shown for failures. Safe to call from every test.
///
/// # Example
///
/// ```rust,ignore
/// use tidings_test::setup_test_logging;
///
/// #[test]
/// fn my_test() {
///     setup_test_logging("tidings_events=trace");
///     // ... test code
/// }
/// ```
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

/// Set up test logging with default filter (warn level).
pub fn setup_test_logging_default() {
    setup_test_logging("warn");
}
