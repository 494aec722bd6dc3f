//! # Runtime events emitted by watch loops and the manager.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Watch events**: what happened to one watch (`file-update`, `read-error`,
//!   `tail-error`, `tail-stopped`, `watch-added`)
//! - **Shutdown events**: runtime-wide teardown progress
//! - **Sink events**: delivery diagnostics (overflow, panic)
//!
//! The [`Event`] struct carries the metadata; [`Event::payload`] projects it to the
//! wire shape a presentation layer expects.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use tailvisor::{Event, EventKind, WatchId};
//!
//! let id = WatchId::new();
//! let ev = Event::file_update(id, "hello");
//!
//! assert_eq!(ev.kind, EventKind::FileUpdate);
//! assert_eq!(ev.kind.as_str(), "file-update");
//! assert_eq!(ev.watch, Some(id));
//! assert_eq!(ev.line.as_deref(), Some("hello"));
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::watch::{WatchId, WatchInfo};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Watch events ===
    /// A watch was registered and its loop spawned.
    ///
    /// Sets `watch`, `path`.
    WatchAdded,

    /// The tail primitive could not be opened; the watch never reads.
    ///
    /// Sets `watch`, `path`, `reason` (failure description).
    TailError,

    /// One read cycle failed; the watch keeps reading.
    ///
    /// Sets `watch`, `reason`.
    ReadError,

    /// One new line was observed.
    ///
    /// Sets `watch`, `line`.
    FileUpdate,

    /// The watch loop exited. Emitted at most once per watch.
    ///
    /// Sets `watch`; `reason` only when the loop panicked.
    TailStopped,

    // === Shutdown events ===
    /// Shutdown requested (explicit call or OS signal).
    ShutdownRequested,

    /// All drained watch loops exited within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some loops did not exit in time.
    GraceExceeded,

    // === Sink events ===
    /// Events were dropped before reaching a sink: its queue stayed full, its
    /// worker is gone, or the sink listener lagged behind the bus.
    ///
    /// Sets `reason`; `watch` when the dropped event belonged to a watch.
    SinkOverflow,

    /// A sink panicked while handling an event.
    ///
    /// Sets `reason`.
    SinkPanicked,
}

impl EventKind {
    /// Stable wire name of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::WatchAdded => "watch-added",
            EventKind::TailError => "tail-error",
            EventKind::ReadError => "read-error",
            EventKind::FileUpdate => "file-update",
            EventKind::TailStopped => "tail-stopped",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::AllStoppedWithin => "all-stopped-within-grace",
            EventKind::GraceExceeded => "grace-exceeded",
            EventKind::SinkOverflow => "sink-overflow",
            EventKind::SinkPanicked => "sink-panicked",
        }
    }
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Watch this event belongs to, if any.
    pub watch: Option<WatchId>,
    /// Observed file path (`WatchAdded`, `TailError`).
    pub path: Option<Arc<Path>>,
    /// Line text (`FileUpdate`).
    pub line: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            watch: None,
            path: None,
            line: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_watch(mut self, id: WatchId) -> Self {
        self.watch = Some(id);
        self
    }

    #[inline]
    pub fn with_path(mut self, path: impl Into<Arc<Path>>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[inline]
    pub fn with_line(mut self, line: impl Into<Arc<str>>) -> Self {
        self.line = Some(line.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// `watch-added` for a freshly registered watch.
    pub fn watch_added(info: &WatchInfo) -> Self {
        Event::new(EventKind::WatchAdded)
            .with_watch(info.id)
            .with_path(info.file_path.as_path())
    }

    /// `file-update` carrying one line.
    pub fn file_update(id: WatchId, line: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::FileUpdate)
            .with_watch(id)
            .with_line(line)
    }

    /// `read-error` for one failed read cycle.
    pub fn read_error(id: WatchId, reason: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::ReadError)
            .with_watch(id)
            .with_reason(reason)
    }

    /// `tail-error` for a tail that could not be opened.
    pub fn tail_error(id: WatchId, path: &Path, reason: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::TailError)
            .with_watch(id)
            .with_path(path)
            .with_reason(reason)
    }

    /// `tail-stopped` for a loop that exited.
    pub fn tail_stopped(id: WatchId) -> Self {
        Event::new(EventKind::TailStopped).with_watch(id)
    }

    /// Creates a sink overflow event for `dropped`, which `sink` did not receive.
    pub fn sink_overflow(sink: &'static str, reason: &'static str, dropped: &Event) -> Self {
        let ev = Event::new(EventKind::SinkOverflow).with_reason(format!("sink={sink} reason={reason}"));
        match dropped.watch {
            Some(id) => ev.with_watch(id),
            None => ev,
        }
    }

    /// Overflow delivered to every sink when the listener skipped `skipped` bus events.
    pub fn bus_lagged(skipped: u64) -> Self {
        Event::new(EventKind::SinkOverflow).with_reason(format!("bus_lagged={skipped}"))
    }

    /// Creates a sink panic event.
    pub fn sink_panicked(sink: &'static str, info: String) -> Self {
        Event::new(EventKind::SinkPanicked).with_reason(format!("sink={sink} panic={info}"))
    }

    /// True for events that describe one watch.
    #[inline]
    pub fn is_watch_event(&self) -> bool {
        self.watch.is_some()
    }

    /// Projects this event to its wire payload.
    ///
    /// Returns `None` for kinds that carry no payload (shutdown progress) or
    /// when a required field is missing.
    pub fn payload(&self) -> Option<EventPayload> {
        match self.kind {
            EventKind::WatchAdded => {
                let id = self.watch?;
                let path = self.path.as_deref()?.to_path_buf();
                Some(EventPayload::WatchAdded(WatchInfo::new(id, path)))
            }
            EventKind::TailError => Some(EventPayload::TailError(TailFailure {
                id: self.watch?,
                error: self.reason.as_deref().unwrap_or_default().to_string(),
            })),
            EventKind::ReadError => Some(EventPayload::ReadError(self.watch?)),
            EventKind::FileUpdate => Some(EventPayload::FileUpdate(FileUpdate {
                id: self.watch?,
                line: self.line.as_deref()?.to_string(),
            })),
            EventKind::TailStopped => Some(EventPayload::TailStopped(self.watch?)),
            EventKind::SinkOverflow | EventKind::SinkPanicked => {
                Some(EventPayload::Reason(self.reason.as_deref()?.to_string()))
            }
            EventKind::ShutdownRequested
            | EventKind::AllStoppedWithin
            | EventKind::GraceExceeded => None,
        }
    }
}

/// One new line observed by a watch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileUpdate {
    pub id: WatchId,
    pub line: String,
}

/// A tail that failed to open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TailFailure {
    pub id: WatchId,
    pub error: String,
}

/// Wire payload of an [`Event`], serialized without a tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    WatchAdded(WatchInfo),
    TailError(TailFailure),
    ReadError(WatchId),
    FileUpdate(FileUpdate),
    TailStopped(WatchId),
    Reason(String),
}
