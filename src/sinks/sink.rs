//! # Core sink trait
//!
//! `Sink` is the outward push capability: the runtime hands every [`Event`] to each
//! sink and never waits for an acknowledgement. Each sink is driven by a dedicated
//! worker fed by a bounded queue owned by the [`SinkSet`](crate::sinks::SinkSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, sockets, UI bridges). A full queue is waited
//!   on for up to [`SEND_PATIENCE`](crate::SEND_PATIENCE), which slows the watch loops
//!   down instead of losing lines.
//! - Each sink **declares** its preferred queue capacity via
//!   [`Sink::queue_capacity`]. A sink whose queue stays full longer than that is
//!   congested: its events are **dropped** and a `sink-overflow` event is published
//!   until it catches up.
//!
//! ## Example
//! ```rust
//! use tailvisor::{Event, EventKind, Sink};
//!
//! struct Toasts;
//!
//! #[async_trait::async_trait]
//! impl Sink for Toasts {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ReadError {
//!             // show "reading failed" for ev.watch
//!         }
//!     }
//!     fn name(&self) -> &'static str { "toasts" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event sinks.
///
/// Called from a sink-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Handle a single event. Use [`Event::kind`] and [`Event::payload`] for the
    /// wire name and payload.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for diagnostics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this sink's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
