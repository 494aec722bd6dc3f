//! # Watcher: the observation loop of one watch.
//!
//! Drives one [`Tail`](crate::Tail) and republishes what it reads as events
//! tagged with the watch identity.
//!
//! ## State machine
//! ```text
//! Starting ──► open(path) ─┬─ Err / panic ──► publish TailError ──► exit(OpenFailed)
//!     │                    └─ Ok ──► Reading
//!     └─ cancelled ──► publish TailStopped ──► exit(Cancelled)
//!
//! Reading: loop { select! (biased) {
//!   ├─► token cancelled      → break Cancelled
//!   └─► tail.next()
//!         ├─ Some(Ok(line))  → publish_paced FileUpdate
//!         ├─ Some(Err(e))    → publish_paced ReadError
//!         │                      └─ e not transient → break TailFailed
//!         ├─ None            → break SourceEnded
//!         └─ panic           → break Panicked
//! }}
//! tail.stop() ──► publish TailStopped (reason "watch_panic" after a panic) ──► exit
//! ```
//!
//! ## Rules
//! - The tail is owned by this loop; `stop()` consumes it and runs exactly once
//!   on every exit path after a successful open, including a panic in `next()`
//! - `TailStopped` is the last event of a watch whose tail opened (or whose
//!   opening was cancelled); `TailError` is the last event of a watch whose tail
//!   failed to open
//! - Transient read errors keep the loop going; any other read error ends it
//! - Lines are published with back-pressure: a loop that outruns the sink listener waits
//! - Cancellation is checked first, so a stopped watch does not emit further lines

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::{
    error::panic_message,
    events::{Bus, Event},
    tail::TailSourceRef,
    watch::Watch,
};

/// `TailStopped` reason of a watch whose tail panicked.
pub(crate) const WATCH_PANIC: &str = "watch_panic";

/// Why a watch loop exited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WatchExit {
    /// Per-watch or runtime token was cancelled.
    Cancelled,
    /// The tail could not be opened.
    OpenFailed,
    /// The tail source ended on its own.
    SourceEnded,
    /// The tail reported an error it cannot recover from.
    TailFailed,
    /// The tail panicked.
    Panicked,
}

/// Observation loop of a single watch.
pub(crate) struct Watcher {
    watch: Watch,
    tails: TailSourceRef,
    bus: Bus,
}

impl Watcher {
    pub(crate) fn new(watch: Watch, tails: TailSourceRef, bus: Bus) -> Self {
        Self { watch, tails, bus }
    }

    /// Runs until the token is cancelled, the tail fails to open, or the tail ends.
    pub(crate) async fn run(self, token: CancellationToken) -> WatchExit {
        let id = self.watch.id();
        let path = self.watch.path();

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            res = AssertUnwindSafe(self.tails.open(path)).catch_unwind() => Some(res),
        };

        let mut tail = match opened {
            None => {
                self.bus.publish(Event::tail_stopped(id));
                return WatchExit::Cancelled;
            }
            Some(Err(panic)) => {
                let msg = panic_message(panic.as_ref());
                tracing::warn!(watch = %id, panic = %msg, "tail open panicked");
                self.bus
                    .publish(Event::tail_error(id, path, format!("open panicked: {msg}")));
                return WatchExit::OpenFailed;
            }
            Some(Ok(Err(e))) => {
                self.bus.publish(Event::tail_error(id, path, e.to_string()));
                return WatchExit::OpenFailed;
            }
            Some(Ok(Ok(tail))) => tail,
        };

        let exit = loop {
            let read = tokio::select! {
                biased;
                _ = token.cancelled() => break WatchExit::Cancelled,
                res = AssertUnwindSafe(tail.next()).catch_unwind() => res,
            };

            let (ev, fatal) = match read {
                Ok(Some(Ok(line))) => (Event::file_update(id, line), false),
                Ok(Some(Err(e))) => {
                    let fatal = !e.is_transient();
                    if fatal {
                        tracing::debug!(watch = %id, error = %e, "tail failed; ending watch");
                    }
                    (Event::read_error(id, e.to_string()), fatal)
                }
                Ok(None) => break WatchExit::SourceEnded,
                Err(panic) => {
                    tracing::warn!(watch = %id, panic = %panic_message(panic.as_ref()), "tail panicked");
                    break WatchExit::Panicked;
                }
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => break WatchExit::Cancelled,
                _ = self.bus.publish_paced(ev) => {}
            }
            if fatal {
                break WatchExit::TailFailed;
            }
        };

        tail.stop().await;
        let stopped = Event::tail_stopped(id);
        self.bus.publish(match exit {
            WatchExit::Panicked => stopped.with_reason(WATCH_PANIC),
            _ => stopped,
        });
        exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TailError;
    use crate::events::EventKind;
    use crate::tail::scripted::ScriptedSource;
    use crate::watch::WatchId;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn watcher(source: &Arc<ScriptedSource>, bus: &Bus, path: &str) -> (WatchId, Watcher) {
        let id = WatchId::new();
        let w = Watcher::new(
            Watch::new(id, PathBuf::from(path)),
            source.clone(),
            bus.clone(),
        );
        (id, w)
    }

    async fn recv(rx: &mut broadcast::Receiver<Event>) -> Event {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("bus closed")
    }

    #[tokio::test]
    async fn lines_then_stop() {
        let source = ScriptedSource::new();
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let (id, w) = watcher(&source, &bus, "/logs/app.log");
        let token = CancellationToken::new();
        let run = tokio::spawn(w.run(token.clone()));

        let path = Path::new("/logs/app.log");
        source.opened(path).await;
        source.push(path, Ok("first".into()));
        source.push(path, Ok("second".into()));

        for expected in ["first", "second"] {
            let ev = recv(&mut rx).await;
            assert_eq!(ev.kind, EventKind::FileUpdate);
            assert_eq!(ev.watch, Some(id));
            assert_eq!(ev.line.as_deref(), Some(expected));
        }

        token.cancel();
        assert_eq!(run.await.unwrap(), WatchExit::Cancelled);

        let ev = recv(&mut rx).await;
        assert_eq!(ev.kind, EventKind::TailStopped);
        assert_eq!(ev.watch, Some(id));
        assert_eq!(source.stops(), 1);
    }

    #[tokio::test]
    async fn read_error_does_not_end_the_loop() {
        let source = ScriptedSource::new();
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let (id, w) = watcher(&source, &bus, "/logs/flaky.log");
        let token = CancellationToken::new();
        let run = tokio::spawn(w.run(token.clone()));

        let path = Path::new("/logs/flaky.log");
        source.opened(path).await;
        source.push(
            path,
            Err(TailError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::other("hiccup"),
            }),
        );
        source.push(path, Ok("after".into()));

        let ev = recv(&mut rx).await;
        assert_eq!(ev.kind, EventKind::ReadError);
        assert_eq!(ev.watch, Some(id));
        assert!(ev.reason.as_deref().unwrap().contains("hiccup"));

        let ev = recv(&mut rx).await;
        assert_eq!(ev.kind, EventKind::FileUpdate);
        assert_eq!(ev.line.as_deref(), Some("after"));

        token.cancel();
        run.await.unwrap();
        assert_eq!(source.stops(), 1);
    }

    #[tokio::test]
    async fn open_failure_emits_tail_error_only() {
        let source = ScriptedSource::new();
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let (id, w) = watcher(&source, &bus, "/logs/missing");

        assert_eq!(
            w.run(CancellationToken::new()).await,
            WatchExit::OpenFailed
        );

        let ev = recv(&mut rx).await;
        assert_eq!(ev.kind, EventKind::TailError);
        assert_eq!(ev.watch, Some(id));
        assert!(rx.try_recv().is_err());
        assert_eq!(source.stops(), 0);
    }

    #[tokio::test]
    async fn cancellation_while_opening_stops_cleanly() {
        let source = ScriptedSource::new();
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let (id, w) = watcher(&source, &bus, "/logs/hang");
        let token = CancellationToken::new();
        let run = tokio::spawn(w.run(token.clone()));

        tokio::task::yield_now().await;
        token.cancel();
        assert_eq!(run.await.unwrap(), WatchExit::Cancelled);

        let ev = recv(&mut rx).await;
        assert_eq!(ev.kind, EventKind::TailStopped);
        assert_eq!(ev.watch, Some(id));
        assert_eq!(source.opens(), 0);
    }

    #[tokio::test]
    async fn source_end_stops_the_tail() {
        let source = ScriptedSource::new();
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let (id, w) = watcher(&source, &bus, "/logs/short.log");
        let run = tokio::spawn(w.run(CancellationToken::new()));

        let path = Path::new("/logs/short.log");
        source.opened(path).await;
        source.close(path);

        assert_eq!(run.await.unwrap(), WatchExit::SourceEnded);
        let ev = recv(&mut rx).await;
        assert_eq!(ev.kind, EventKind::TailStopped);
        assert_eq!(ev.watch, Some(id));
        assert_eq!(source.stops(), 1);
    }

    #[tokio::test]
    async fn fatal_read_error_ends_the_watch() {
        let source = ScriptedSource::new();
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let (id, w) = watcher(&source, &bus, "/logs/gone.log");
        let run = tokio::spawn(w.run(CancellationToken::new()));

        let path = Path::new("/logs/gone.log");
        source.opened(path).await;
        source.push(path, Err(TailError::NotAFile { path: path.to_path_buf() }));
        source.push(path, Ok("never read".into()));

        assert_eq!(run.await.unwrap(), WatchExit::TailFailed);

        let ev = recv(&mut rx).await;
        assert_eq!(ev.kind, EventKind::ReadError);
        assert_eq!(ev.watch, Some(id));

        let ev = recv(&mut rx).await;
        assert_eq!(ev.kind, EventKind::TailStopped);
        assert_eq!(ev.reason, None);
        assert!(rx.try_recv().is_err());
        assert_eq!(source.stops(), 1);
    }

    #[tokio::test]
    async fn panicking_read_still_stops_the_tail() {
        let source = ScriptedSource::new();
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let (id, w) = watcher(&source, &bus, "/logs/boom.log");
        let run = tokio::spawn(w.run(CancellationToken::new()));

        let path = Path::new("/logs/boom.log");
        source.opened(path).await;
        source.push(path, Ok("before".into()));
        source.explode(path);

        assert_eq!(run.await.unwrap(), WatchExit::Panicked);
        assert_eq!(source.stops(), 1);

        assert_eq!(recv(&mut rx).await.line.as_deref(), Some("before"));
        let ev = recv(&mut rx).await;
        assert_eq!(ev.kind, EventKind::TailStopped);
        assert_eq!(ev.watch, Some(id));
        assert_eq!(ev.reason.as_deref(), Some(WATCH_PANIC));
    }

    #[tokio::test]
    async fn panicking_open_is_a_tail_error() {
        let source = ScriptedSource::new();
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let (id, w) = watcher(&source, &bus, "/logs/broken");

        assert_eq!(
            w.run(CancellationToken::new()).await,
            WatchExit::OpenFailed
        );

        let ev = recv(&mut rx).await;
        assert_eq!(ev.kind, EventKind::TailError);
        assert_eq!(ev.watch, Some(id));
        assert!(ev.reason.as_deref().unwrap().contains("scripted open panicked"));
        assert!(rx.try_recv().is_err(), "a tail that never opened is not stopped");
        assert_eq!(source.stops(), 0);
    }

    #[tokio::test]
    async fn paced_lines_wait_for_the_listener() {
        let source = ScriptedSource::new();
        let (bus, mut listener) = Bus::paced(4);
        let (_id, w) = watcher(&source, &bus, "/logs/fast.log");
        let run = tokio::spawn(w.run(CancellationToken::new()));

        let path = Path::new("/logs/fast.log");
        source.opened(path).await;
        for i in 0..50 {
            source.push(path, Ok(format!("line {i}")));
        }
        source.close(path);

        // The bus holds four events; every line still arrives because the loop waits.
        for i in 0..50 {
            let ev = tokio::time::timeout(Duration::from_secs(5), listener.recv())
                .await
                .expect("timed out waiting for a line")
                .expect("lagged or closed");
            assert_eq!(ev.line.as_deref(), Some(format!("line {i}").as_str()));
        }
        assert_eq!(run.await.unwrap(), WatchExit::SourceEnded);
    }
}
