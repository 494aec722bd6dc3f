//! # ChannelSink: in-process transport
//!
//! Forwards every event into a bounded [`mpsc`] channel so a presentation layer
//! (UI bridge, socket writer, test) can consume the stream with `recv().await`.
//!
//! Optionally restricted to watch events (`file-update`, `read-error`,
//! `tail-error`, `tail-stopped`, `watch-added`) with [`ChannelSink::watch_events_only`].

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::events::Event;
use crate::sinks::Sink;

/// Sink that forwards events into an mpsc channel.
///
/// Its queue in the [`SinkSet`](crate::SinkSet) is as deep as the channel.
pub struct ChannelSink {
    tx: mpsc::Sender<Event>,
    capacity: usize,
    watch_only: bool,
}

impl ChannelSink {
    /// Creates the sink and the receiving half of its channel.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx,
                capacity,
                watch_only: false,
            },
            rx,
        )
    }

    /// Drops runtime-wide events; only events tied to a watch are forwarded.
    #[must_use]
    pub fn watch_events_only(mut self) -> Self {
        self.watch_only = true;
        self
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn on_event(&self, event: &Event) {
        if self.watch_only && !event.is_watch_event() {
            return;
        }
        // Receiver gone: nobody is listening any more.
        let _ = self.tx.send(event.clone()).await;
    }

    fn name(&self) -> &'static str {
        "channel"
    }

    fn queue_capacity(&self) -> usize {
        self.capacity
    }
}
