//! Test utilities for QueryCache integration tests
//!
//! - CacheFixture: isolated cache services plus a counting fake engine
//! - queries: reusable query shapes

pub mod queries;
pub mod test_fixture;

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
