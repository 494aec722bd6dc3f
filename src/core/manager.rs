//! # WatchManager: registers watches, stops them, and shuts everything down.
//!
//! The [`WatchManager`] owns the event bus, the watch [`Registry`], the sink
//! listener, and the runtime cancellation token. Each watch runs in its own
//! loop (see `core::watcher`) with a child token of the runtime token.
//!
//! ## High-level architecture
//! ```text
//! select_and_watch() ── FileSelector::select() (blocking pool)
//!        │                    ├─ Err ──► SelectionFailed { info(empty path), source }
//!        ▼                    └─ Ok(path)
//! watch_path(path) ──► Registry::register(Watch)
//!                          ├─► publish WatchAdded
//!                          └─► spawn Watcher::run(runtime_token.child_token())
//!
//! stop_watch(id)  ──► Registry::remove(id, grace) ──► cancel child ──► await loop (bounded)
//!
//! Event flow:
//!   Watcher ── publish_paced(Event) ──► Bus ──► sink listener ──► SinkSet::deliver(&Event)
//!                  ▲                                 │ Lagged(n) ──► SinkOverflow(bus_lagged=n)
//!                  └──── waits while listener is behind ┘
//!                                                   ┌─────────┼─────────┐
//!                                                   ▼         ▼         ▼
//!                                                sink 1    sink 2 ...  sink N
//!
//! Shutdown path:
//!   shutdown()            ──► publish ShutdownRequested ──► runtime_token.cancel()
//!   shutdown_with_grace() ──► shutdown() ──► Registry::drain()
//!                              └─► wait for drained loops up to cfg.grace:
//!                                    ├─ all joined ──► publish AllStoppedWithinGrace
//!                                    └─ timeout    ──► publish GraceExceeded (stuck ids)
//!                              └─► flush and close sinks
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tailvisor::{ChannelSink, Config, EventKind, WatchManager};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dir = std::env::temp_dir().join(format!("tailvisor-doc-{}", std::process::id()));
//!     std::fs::create_dir_all(&dir)?;
//!     let file = dir.join("app.log");
//!     std::fs::write(&file, "hello\n")?;
//!
//!     let (sink, mut events) = ChannelSink::new(64);
//!     let manager = WatchManager::builder(Config::default())
//!         .with_sink(Arc::new(sink.watch_events_only()))
//!         .build();
//!
//!     let info = manager.watch_path(&file).await;
//!     assert_eq!(info.file_name, "app.log");
//!
//!     while let Some(ev) = events.recv().await {
//!         if ev.kind == EventKind::FileUpdate {
//!             assert_eq!(ev.line.as_deref(), Some("hello"));
//!             break;
//!         }
//!     }
//!
//!     manager.stop_watch(info.id).await;
//!     manager.shutdown_with_grace().await?;
//!     std::fs::remove_dir_all(&dir)?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{Config, builder::WatchManagerBuilder, registry::Registry, shutdown},
    error::{RuntimeError, SelectError, SelectionFailed},
    events::{Bus, Event, EventKind, PacedReceiver},
    select::FileSelectorRef,
    sinks::SinkSet,
    watch::{Watch, WatchId, WatchInfo},
};

/// Lower bound on the time given to sinks to flush during graceful shutdown.
const MIN_SINK_FLUSH: Duration = Duration::from_secs(1);

/// Owner of all active watches.
///
/// Built with [`WatchManager::builder`]. All operations take `&self`, so the
/// manager is typically shared as `Arc<WatchManager>`.
pub struct WatchManager {
    cfg: Config,
    bus: Bus,
    registry: Arc<Registry>,
    selector: FileSelectorRef,

    runtime_token: CancellationToken,
    sink_token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
    shutdown_requested: AtomicBool,
}

impl WatchManager {
    /// Creates a builder for configuring the manager.
    ///
    /// # Example
    /// ```rust
    /// use tailvisor::{Config, FixedSelector, WatchManager};
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() {
    ///     let manager = WatchManager::builder(Config::default())
    ///         .with_selector(FixedSelector::new("/var/log/syslog"))
    ///         .build();
    ///     assert!(manager.is_empty().await);
    /// }
    /// ```
    pub fn builder(cfg: Config) -> WatchManagerBuilder {
        WatchManagerBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        registry: Arc<Registry>,
        selector: FileSelectorRef,
        runtime_token: CancellationToken,
        events: PacedReceiver,
        sinks: SinkSet,
    ) -> Self {
        let sink_token = CancellationToken::new();
        let listener = spawn_sink_listener(events, sinks, sink_token.clone());
        Self {
            cfg,
            bus,
            registry,
            selector,
            runtime_token,
            sink_token,
            listener: Mutex::new(Some(listener)),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    /// Asks the file selector for a path and starts watching it.
    ///
    /// The selector runs on the blocking pool. On failure nothing is registered
    /// and the returned [`SelectionFailed`] carries a fresh identity with an empty path.
    /// On success the watch is registered and its loop spawned; this does not
    /// wait for the file to be opened.
    pub async fn select_and_watch(&self) -> Result<WatchInfo, SelectionFailed> {
        let id = WatchId::new();
        let selector = Arc::clone(&self.selector);

        let selected = match tokio::task::spawn_blocking(move || selector.select()).await {
            Ok(res) => res,
            Err(e) => Err(SelectError::Other(format!("selector task failed: {e}"))),
        };

        match selected {
            Ok(path) => Ok(self.registry.register(Watch::new(id, path)).await),
            Err(source) => {
                tracing::debug!(watch = %id, error = %source, "file selection failed");
                Err(SelectionFailed {
                    info: WatchInfo::new(id, PathBuf::new()),
                    source,
                })
            }
        }
    }

    /// Starts watching `path` under a fresh identity.
    ///
    /// Paths are taken as given (not canonicalized): watching the same file
    /// twice yields two independent watches.
    pub async fn watch_path(&self, path: impl Into<PathBuf>) -> WatchInfo {
        let watch = Watch::new(WatchId::new(), path.into());
        self.registry.register(watch).await
    }

    /// Stops one watch and waits up to [`Config::grace`] for its loop to finish.
    ///
    /// When the loop finishes in time, its `TailStopped` has been published and no
    /// further events carry its identity. A loop still running after the grace
    /// period is logged and left to finish on its own; the watch is no longer
    /// listed either way. Unknown or already stopped ids are a no-op.
    pub async fn stop_watch(&self, id: WatchId) {
        if !self.registry.remove(id, self.cfg.grace).await {
            tracing::debug!(watch = %id, "stop requested for unknown watch");
        }
    }

    /// Requests shutdown of every watch without waiting.
    ///
    /// Publishes `ShutdownRequested` on the first call only; later calls are no-ops.
    /// Watches registered afterwards stop immediately.
    pub fn shutdown(&self) {
        if !self.shutdown_requested.swap(true, Ordering::AcqRel) {
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
        }
        self.runtime_token.cancel();
    }

    /// Shuts down and waits up to [`Config::grace`] for every watch loop to finish,
    /// then flushes and closes the sinks.
    ///
    /// Returns [`RuntimeError::GraceExceeded`] listing the loops still running
    /// when the grace period ended.
    pub async fn shutdown_with_grace(&self) -> Result<(), RuntimeError> {
        self.shutdown();

        let grace = self.cfg.grace;
        let deadline = Instant::now() + grace;
        let mut stuck = Vec::new();

        for (id, join) in self.registry.drain().await {
            if tokio::time::timeout_at(deadline, join).await.is_err() {
                stuck.push(id);
            }
        }
        stuck.sort_unstable();

        let res = if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            let reason = stuck
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            self.bus
                .publish(Event::new(EventKind::GraceExceeded).with_reason(format!("stuck={reason}")));
            Err(RuntimeError::GraceExceeded { grace, stuck })
        };

        self.close_sinks().await;
        res
    }

    /// Runs until a termination signal arrives or [`shutdown`](Self::shutdown)
    /// is called, then performs [`shutdown_with_grace`](Self::shutdown_with_grace).
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "signal registration failed; waiting for explicit shutdown");
                    self.runtime_token.cancelled().await;
                }
            }
            _ = self.runtime_token.cancelled() => {}
        }
        self.shutdown_with_grace().await
    }

    /// Returns sorted ids of active watches.
    pub async fn list(&self) -> Vec<WatchId> {
        self.registry.list().await
    }

    /// Returns projections of active watches, sorted by path.
    pub async fn watches(&self) -> Vec<WatchInfo> {
        self.registry.infos().await
    }

    pub async fn is_watching(&self, id: WatchId) -> bool {
        self.registry.contains(id).await
    }

    pub async fn len(&self) -> usize {
        self.registry.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.registry.len().await == 0
    }

    /// Subscribes directly to the event bus.
    ///
    /// Watch loops are paced by the sink listener only: receivers created here
    /// that fall behind by more than `bus_capacity` events skip the oldest ones.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    async fn close_sinks(&self) {
        self.sink_token.cancel();

        let listener = self.listener.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = listener {
            let flush = self.cfg.grace.max(MIN_SINK_FLUSH);
            if tokio::time::timeout(flush, handle).await.is_err() {
                tracing::warn!(?flush, "sinks did not flush in time");
            }
        }
    }
}

impl Drop for WatchManager {
    fn drop(&mut self) {
        self.runtime_token.cancel();
        self.sink_token.cancel();
    }
}

/// Forwards bus events to the sink set until `token` is cancelled, then
/// delivers whatever is still buffered and closes the sinks.
///
/// Events skipped by the bus reach the sinks as one `SinkOverflow` with
/// reason `bus_lagged=<n>`.
fn spawn_sink_listener(
    mut events: PacedReceiver,
    mut sinks: SinkSet,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let ev = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                res = events.recv() => match res {
                    Ok(ev) => ev,
                    Err(RecvError::Lagged(skipped)) => lagged(skipped),
                    Err(RecvError::Closed) => break,
                },
            };
            sinks.deliver(&ev).await;
        }

        loop {
            let ev = match events.try_recv() {
                Ok(ev) => ev,
                Err(TryRecvError::Lagged(skipped)) => lagged(skipped),
                Err(_) => break,
            };
            sinks.deliver(&ev).await;
        }
        drop(events);
        sinks.shutdown().await;
    })
}

fn lagged(skipped: u64) -> Event {
    tracing::warn!(skipped, "sink listener lagged behind the event bus");
    Event::bus_lagged(skipped)
}
