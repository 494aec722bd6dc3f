//! # tailvisor
//!
//! **Tailvisor** manages the lifecycle of file watches: each watch follows one
//! file (like `tail -f`) and reports new lines, failures and its own end as
//! events that a presentation layer (desktop bridge, CLI, log forwarder) consumes.
//!
//! The crate is a building block: it does not render anything, it pushes
//! [`Event`]s to the [`Sink`]s it was built with.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   FileSelector (prompt)        caller with a path
//!            │                          │
//!            ▼                          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  WatchManager                                                     │
//! │  - Registry (active watches by WatchId)                           │
//! │  - Bus (broadcast events)                                         │
//! │  - SinkSet (fans out to user sinks)                               │
//! │  - runtime CancellationToken (parent of every watch token)        │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Watcher    │   │   Watcher    │   │   Watcher    │
//!     │  (app.log)   │   │  (db.log)    │   │  (x.log)     │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ Tail::next()     │                  │
//!      │ Publishes (paced)│                  │
//!      │ - FileUpdate     │                  │
//!      │ - ReadError      │                  │
//!      │ - TailError      │                  │
//!      │ - TailStopped    │                  │
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                  (capacity: Config::bus_capacity)                 │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                          sink listener ──► SinkSet     (lag ──► SinkOverflow)
//!                                   ┌─────────┼─────────┐
//!                                   ▼         ▼         ▼
//!                                worker1   worker2   workerN
//!                                   ▼         ▼         ▼
//!                              sink.on_event(&Event) (per sink)
//! ```
//!
//! ### Lifecycle of one watch
//! ```text
//! watch_path / select_and_watch ──► WatchAdded ──► Watcher::run(child token)
//!
//!   open(path) ─┬─ Err ──► TailError            (terminal, entry removed)
//!               └─ Ok  ──► loop {
//!                            line       ──► FileUpdate { id, line }
//!                            read err   ──► ReadError { id }   (transient: keeps reading)
//!                            fatal err  ──► ReadError { id } then break
//!                            cancelled  ──► break
//!                            source end ──► break
//!                            panic      ──► break
//!                          }
//!                          tail.stop() ──► TailStopped { id }  (exactly once)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Watches**       | Start, stop and list watches; graceful shutdown.             | [`WatchManager`], [`WatchInfo`]           |
//! | **Sink API**      | Receive runtime events (UI bridges, logging, channels).      | [`Sink`], [`ChannelSink`]                 |
//! | **Tail primitive**| Pluggable incremental line reader; polling default.          | [`TailSource`], [`Tail`], [`PollingTails`]|
//! | **Selection**     | Pluggable "pick a file" prompt.                              | [`FileSelector`], [`StdinSelector`]       |
//! | **Errors**        | Typed errors for selection, tails and the runtime.           | [`SelectionFailed`], [`TailError`], [`RuntimeError`] |
//! | **Configuration** | Centralize runtime settings.                                 | [`Config`]                                |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use tailvisor::{Config, StdinSelector, WatchManager};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let sinks: Vec<Arc<dyn tailvisor::Sink>> = vec![Arc::new(tailvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let sinks: Vec<Arc<dyn tailvisor::Sink>> = Vec::new();
//!
//!     let manager = WatchManager::builder(Config::default())
//!         .with_sinks(sinks)
//!         .with_selector(StdinSelector)
//!         .build();
//!
//!     match manager.select_and_watch().await {
//!         Ok(info) => println!("watching {} as {}", info.file_name, info.id),
//!         Err(e) => eprintln!("nothing selected: {e}"),
//!     }
//!
//!     manager.run_until_signal().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod select;
mod sinks;
mod tail;
mod watch;

// ---- Public re-exports ----

pub use core::{Config, WatchManager, WatchManagerBuilder};
pub use error::{RuntimeError, SelectError, SelectionFailed, TailError};
pub use events::{Event, EventKind, EventPayload, FileUpdate, TailFailure};
pub use select::{FileSelector, FixedSelector, StdinSelector};
pub use sinks::{ChannelSink, Sink, SinkSet, SEND_PATIENCE};
pub use tail::{LineRead, PollingTail, PollingTails, Tail, TailSource, TailStart};
pub use watch::{WatchId, WatchInfo};

// Optional: expose a simple built-in logger sink (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use sinks::LogWriter;
