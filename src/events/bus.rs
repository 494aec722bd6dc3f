//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! event publishing from many sources (watch loops, registry, manager).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                   Listener (one):
//!   Watch loop 1 ──┐ publish_paced
//!   Watch loop 2 ──┼──────► Bus ───────► PacedReceiver ────► SinkSet
//!   Watch loop N ──┤  (broadcast chan)    (in WatchManager)
//!   Registry     ──┘ publish                  │
//!        ▲                                    │
//!        └──────── drained count (watch) ◄────┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never waits.
//! - **Paced publish**: `publish_paced()` waits while the paced receiver is more than
//!   half the capacity behind, so a single burst cannot overrun the listener.
//! - **Per-publisher order**: events from one loop are received in publish order.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no receivers at send time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio::sync::watch;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees for plain subscribers.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
    published: Arc<AtomicU64>,
    drained: Option<watch::Receiver<u64>>,
    high_water: u64,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self {
            tx,
            published: Arc::new(AtomicU64::new(0)),
            drained: None,
            high_water: (capacity / 2).max(1) as u64,
        }
    }

    /// Creates a bus together with the receiver that paces [`Bus::publish_paced`].
    pub(crate) fn paced(capacity: usize) -> (Self, PacedReceiver) {
        let mut bus = Self::new(capacity);
        let (drained_tx, drained_rx) = watch::channel(0);
        bus.drained = Some(drained_rx);

        let rx = PacedReceiver {
            rx: bus.tx.subscribe(),
            drained: drained_tx,
            seen: 0,
        };
        (bus, rx)
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        self.send(ev);
    }

    /// Publishes `ev`, then waits until the paced receiver is at most half the
    /// capacity behind.
    ///
    /// Returns right away on a bus built with [`Bus::new`] or once the paced
    /// receiver has been dropped. Cancel-safe: the event is already sent when the
    /// first await point is reached.
    pub(crate) async fn publish_paced(&self, ev: Event) {
        let sent = self.send(ev);
        let Some(drained) = &self.drained else {
            return;
        };

        let high_water = self.high_water;
        let behind = sent.saturating_sub(*drained.borrow());
        if behind <= high_water {
            return;
        }
        let mut drained = drained.clone();
        let _ = drained
            .wait_for(|seen| sent.saturating_sub(*seen) <= high_water)
            .await;
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    fn send(&self, ev: Event) -> u64 {
        let sent = self.published.fetch_add(1, Ordering::AcqRel) + 1;
        let _ = self.tx.send(ev);
        sent
    }
}

/// Receiver whose progress releases publishers waiting in [`Bus::publish_paced`].
pub(crate) struct PacedReceiver {
    rx: broadcast::Receiver<Event>,
    drained: watch::Sender<u64>,
    seen: u64,
}

impl PacedReceiver {
    /// Cancel-safe, like [`broadcast::Receiver::recv`].
    pub(crate) async fn recv(&mut self) -> Result<Event, RecvError> {
        let res = self.rx.recv().await;
        match &res {
            Ok(_) => self.advance(1),
            Err(RecvError::Lagged(skipped)) => self.advance(*skipped),
            Err(RecvError::Closed) => {}
        }
        res
    }

    pub(crate) fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        let res = self.rx.try_recv();
        match &res {
            Ok(_) => self.advance(1),
            Err(TryRecvError::Lagged(skipped)) => self.advance(*skipped),
            Err(_) => {}
        }
        res
    }

    fn advance(&mut self, n: u64) {
        self.seen += n;
        self.drained.send_replace(self.seen);
    }
}
