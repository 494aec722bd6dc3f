//! # Back-pressured event fan-out to multiple sinks.
//!
//! Provides [`SinkSet`]: hands every event to each sink's bounded queue, served
//! by one worker task per sink.
//!
//! ## Architecture
//! ```text
//! deliver(event)
//!     │
//!     ├──► lane 1 [queue] ──► worker 1 ──► sink1.on_event()
//!     │      │                   └──────► panic → SinkPanicked
//!     │      └─ full > SEND_PATIENCE ──► congested → SinkOverflow(watch)
//!     ├──► lane 2 [queue] ──► worker 2 ──► sink2.on_event()
//!     └──► lane N [queue] ──► worker N ──► sinkN.on_event()
//! ```
//!
//! ## Rules
//! - **Per-sink FIFO**: each sink sees events in order, so lines of one watch stay in append order
//! - **Back-pressure**: a full queue is waited on for up to [`SEND_PATIENCE`]; a sink that keeps
//!   up slowly loses nothing and slows the caller down
//! - **Congestion**: a queue still full after the patience runs out marks the lane congested;
//!   events for a congested lane are dropped (one `SinkOverflow` each, tagged with the dropped
//!   event's watch) until its queue is half empty again
//! - **No cross-sink ordering**: sink A may process event N while B processes N+5
//! - Overflow reports are never reported as overflowing themselves
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a sink panics while holding a lock.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::sinks::Sink;

/// How long [`SinkSet::deliver`] waits on a full queue before declaring the sink congested.
pub const SEND_PATIENCE: Duration = Duration::from_millis(100);

/// Queue into one sink worker.
struct Lane {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
    congested: bool,
}

impl Lane {
    /// A congested lane recovers once half of its queue is free again.
    fn has_recovered(&self) -> bool {
        self.sender.capacity() * 2 >= self.sender.max_capacity()
    }

    /// Queues `event`; returns the overflow reason when it was dropped instead.
    async fn push(&mut self, event: &Arc<Event>) -> Option<&'static str> {
        if self.congested && self.has_recovered() {
            self.congested = false;
        }

        let event = match self.sender.try_send(Arc::clone(event)) {
            Ok(()) => return None,
            Err(TrySendError::Closed(_)) => return Some("closed"),
            Err(TrySendError::Full(_)) if self.congested => return Some("full"),
            Err(TrySendError::Full(event)) => event,
        };

        match tokio::time::timeout(SEND_PATIENCE, self.sender.send(event)).await {
            Ok(Ok(())) => None,
            Ok(Err(_)) => Some("closed"),
            Err(_elapsed) => {
                self.congested = true;
                tracing::warn!(sink = self.name, "sink queue stayed full; dropping its events");
                Some("full")
            }
        }
    }
}

/// Fan-out coordinator for multiple event sinks.
pub struct SinkSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SinkSet {
    /// Creates a new set and spawns one worker task per sink.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn Sink>>, bus: Bus) -> Self {
        let mut lanes = Vec::with_capacity(sinks.len());
        let mut workers = Vec::with_capacity(sinks.len());

        for sink in sinks {
            let (sender, rx) = mpsc::channel::<Arc<Event>>(sink.queue_capacity().max(1));
            lanes.push(Lane {
                name: sink.name(),
                sender,
                congested: false,
            });
            workers.push(tokio::spawn(run_worker(sink, rx, bus.clone())));
        }
        Self {
            lanes,
            workers,
            bus,
        }
    }

    /// Delivers an event to every sink, waiting on full queues for at most
    /// [`SEND_PATIENCE`] per sink.
    ///
    /// A sink that does not get the event is reported with `SinkOverflow`,
    /// unless the event is itself an overflow report.
    pub async fn deliver(&mut self, event: &Event) {
        let event = Arc::new(event.clone());
        let is_overflow_evt = matches!(event.kind, EventKind::SinkOverflow);

        for lane in &mut self.lanes {
            let Some(reason) = lane.push(&event).await else {
                continue;
            };
            if !is_overflow_evt {
                self.bus.publish(Event::sink_overflow(lane.name, reason, &event));
            }
        }
    }

    /// Number of sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// True if there are no sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Gracefully shuts down all sink workers.
    ///
    /// 1. Drops all senders (workers drain their queues and see the channel closed)
    /// 2. Awaits all worker tasks
    pub async fn shutdown(self) {
        drop(self.lanes);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

/// Feeds one sink until its queue closes; a panicking `on_event` costs that event only.
async fn run_worker(sink: Arc<dyn Sink>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        if let Err(panic) = AssertUnwindSafe(sink.on_event(&ev)).catch_unwind().await {
            bus.publish(Event::sink_panicked(sink.name(), panic_message(panic.as_ref())));
        }
    }
}
