//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`EventPayload`] and friends: the wire shape handed to presentation layers
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`, with paced publishing for watch loops
//!
//! ## Quick reference
//! - **Publishers**: watch loops, `Registry`, `WatchManager`, `SinkSet` workers.
//! - **Consumer**: `WatchManager`'s sink listener, which fans out to the `SinkSet`.

mod bus;
mod event;

pub use bus::Bus;
pub(crate) use bus::PacedReceiver;
pub use event::{Event, EventKind, EventPayload, FileUpdate, TailFailure};
