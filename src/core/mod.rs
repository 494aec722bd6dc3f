//! Runtime core: watch registration, observation loops, and shutdown.
//!
//! The public API from this module is [`WatchManager`] (built through
//! [`WatchManagerBuilder`]) and its [`Config`].
//!
//! Internal modules:
//! - [`watcher`]: observation loop of one watch (open, read, stop);
//! - [`registry`]: active watches by identity, loop handles and self-cleanup;
//! - [`manager`]: public operations, sink listener, graceful shutdown;
//! - [`shutdown`]: cross-platform termination signals.

mod builder;
mod config;
mod manager;
mod registry;
mod shutdown;
mod watcher;

pub use builder::WatchManagerBuilder;
pub use config::Config;
pub use manager::WatchManager;
