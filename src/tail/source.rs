//! # Tail primitive abstractions.
//!
//! A [`TailSource`] opens a [`Tail`] for a path. A [`Tail`] yields line-read
//! results in append order until it is stopped.
//!
//! ## Rules
//! - [`Tail::next`] **must be cancel-safe**: the watch loop races it against
//!   cancellation and drops the future when cancellation wins.
//! - [`Tail::stop`] consumes the tail, so it can run at most once; the watch loop
//!   calls it exactly once on every path that ends a watch whose tail opened.
//! - `next()` returning `None` means the source ended for good.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::TailError;

/// Result of one read cycle.
pub type LineRead = Result<String, TailError>;

/// # Running tail of one file.
pub trait Tail: Send + 'static {
    /// Waits for the next line-read result. `None` once the source ended.
    fn next(&mut self) -> BoxFuture<'_, Option<LineRead>>;

    /// Stops the tail and releases its resources.
    fn stop(self: Box<Self>) -> BoxFuture<'static, ()>;
}

/// # Factory of tails.
///
/// Opening happens inside the watch loop, after
/// [`WatchManager::watch_path`](crate::WatchManager::watch_path) has already
/// returned.
#[async_trait]
pub trait TailSource: Send + Sync + 'static {
    /// Opens `path` in follow mode.
    async fn open(&self, path: &Path) -> Result<Box<dyn Tail>, TailError>;
}

/// Shared handle to a tail source.
pub type TailSourceRef = Arc<dyn TailSource>;
