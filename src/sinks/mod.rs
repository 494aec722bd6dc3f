//! # Event sinks for the tailvisor runtime.
//!
//! This module provides the [`Sink`] trait, the [`SinkSet`] fan-out, and built-in
//! implementations for handling events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Watch loop ── publish(Event) ──► Bus ──► sink listener ──► SinkSet::deliver(&Event)
//!                                                                │
//!                                                   ┌────────────┼────────────┐
//!                                                   ▼            ▼            ▼
//!                                              ChannelSink   LogWriter     Custom
//! ```
//!
//! ## Built-in sinks
//! - [`ChannelSink`]: forwards events into an mpsc channel (in-process transport)
//! - `LogWriter`: renders events via `tracing` (feature `logging`)

mod channel;
mod set;
mod sink;

#[cfg(feature = "logging")]
mod embedded;

pub use channel::ChannelSink;
pub use set::{SinkSet, SEND_PATIENCE};
pub use sink::Sink;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
