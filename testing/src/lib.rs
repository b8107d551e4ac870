//! # Searchbox Testing
//!
//! Testing utilities and helpers for searchbox reducers and stores.
//!
//! This crate provides:
//! - [`ReducerTest`]: given/when/then harness for pure reducer tests
//! - [`mocks::FixedClock`]: deterministic time
//! - [`ResponseScript`]: hand-driven async responses, so a test decides the
//!   order in which in-flight requests settle
//! - [`init_test_tracing`]: log capture for `cargo test`
//!
//! ## Example
//!
//! ```ignore
//! use searchbox_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(SearchReducer::new())
//!     .with_env(test_environment())
//!     .given_state(SearchState::default())
//!     .when_action(SearchAction::query_changed("rust"))
//!     .then_state(|s| assert!(s.request.is_loading()))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use searchbox_core::environment::Clock;

/// Ergonomic reducer tests
pub mod reducer_test;

/// Scripted async responses
pub mod scripted;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use searchbox_testing::mocks::FixedClock;
    /// use searchbox_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a tracing subscriber that writes through the test harness
///
/// Safe to call from every test; only the first call installs anything.
/// Honours `RUST_LOG`, defaulting to `debug`.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
pub use scripted::{Responder, ResponseScript};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
