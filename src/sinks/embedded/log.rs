//! # LogWriter: event logger
//!
//! A sink that renders incoming [`Event`]s through `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO watch-added watch=5f0c… path="/var/log/app.log"
//! INFO file-update watch=5f0c… line="GET /health 200"
//! WARN read-error watch=5f0c… reason="read from /var/log/app.log failed: …"
//! WARN tail-error watch=77aa… reason="cannot open /nope: No such file or directory"
//! INFO tail-stopped watch=5f0c…
//! INFO shutdown-requested
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::{Event, EventKind};
use crate::sinks::Sink;

/// Event writer sink.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sink for LogWriter {
    async fn on_event(&self, e: &Event) {
        let kind = e.kind.as_str();
        let watch = e.watch.map(|id| id.to_string()).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::WatchAdded => {
                let path = e.path.as_deref().map(|p| p.display().to_string());
                info!(watch, path = path.as_deref().unwrap_or(""), "{kind}");
            }
            EventKind::FileUpdate => {
                info!(watch, line = e.line.as_deref().unwrap_or(""), "{kind}");
            }
            EventKind::TailStopped if e.reason.is_some() => {
                warn!(watch, reason, "{kind}");
            }
            EventKind::TailStopped => {
                info!(watch, "{kind}");
            }
            EventKind::ReadError | EventKind::TailError => {
                warn!(watch, reason, "{kind}");
            }
            EventKind::ShutdownRequested | EventKind::AllStoppedWithin => {
                info!("{kind}");
            }
            EventKind::GraceExceeded => {
                warn!("{kind}");
            }
            EventKind::SinkOverflow | EventKind::SinkPanicked => {
                warn!(reason, "{kind}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
