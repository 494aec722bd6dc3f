//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the watch runtime.
//!
//! Config is used in two ways:
//! 1. **Manager creation**: `WatchManager::builder(config)`
//! 2. **Tail defaults**: the default [`PollingTails`](crate::PollingTails) source is built from it
//!
//! ## Sentinel values
//! - `grace = 0s` → graceful shutdown does not wait at all
//! - `bus_capacity`, `line_buffer` → clamped to a minimum of 1
//! - `poll_interval` → clamped to a minimum of 1ms

use std::time::Duration;

use crate::tail::TailStart;

/// Lower bound for the polling interval.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Global configuration for the watch runtime.
///
/// ## Field semantics
/// - `grace`: maximum wait for watch loops during [`shutdown_with_grace`](crate::WatchManager::shutdown_with_grace)
///   and for one loop during [`stop_watch`](crate::WatchManager::stop_watch)
/// - `bus_capacity`: event bus ring buffer size
/// - `poll_interval`: how often a tail re-checks a file that is at EOF
/// - `line_buffer`: capacity of each tail's line channel
/// - `start`: where a freshly opened tail starts reading
///
/// ## Notes
/// All fields are public. Prefer the accessors to avoid sprinkling sentinel
/// checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum time to wait for watch loops to exit during graceful shutdown,
    /// and for a single loop when its watch is stopped.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Watch loops wait while the sink listener is more than half of it behind.
    /// Direct subscribers that lag behind more than `bus_capacity` events skip
    /// older items (delivery is at-most-once).
    pub bus_capacity: usize,

    /// Polling period used while a tailed file has no new data.
    pub poll_interval: Duration,

    /// Capacity of the per-tail line channel.
    pub line_buffer: usize,

    /// Where newly opened tails start reading.
    pub start: TailStart,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the polling interval clamped to at least 1ms.
    #[inline]
    pub fn poll_interval_clamped(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }

    /// Returns the line channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn line_buffer_clamped(&self) -> usize {
        self.line_buffer.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `grace = 10s`
    /// - `bus_capacity = 1024`
    /// - `poll_interval = 250ms`
    /// - `line_buffer = 256`
    /// - `start = TailStart::Beginning`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
            poll_interval: Duration::from_millis(250),
            line_buffer: 256,
            start: TailStart::default(),
        }
    }
}
