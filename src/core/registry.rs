//! # Watch registry: the set of active watches.
//!
//! Maps [`WatchId`] → handle (per-watch `CancellationToken` + loop `JoinHandle`).
//!
//! ## Architecture
//! ```text
//! WatchManager
//!   ├─► register(watch) → publish WatchAdded → spawn Watcher::run(child token) → insert
//!   ├─► remove(id, wait) → take handle → cancel token → join loop (at most `wait`)
//!   └─► drain()         → take all handles (shutdown)
//!
//! Watch loop exit ──► forget(id)   (self-cleanup: open failure, source end, tail failure, panic)
//! ```
//!
//! ## Rules
//! - The registry owns the loop handles (JoinHandle + CancellationToken)
//! - Each watch token is a child of the runtime token: shutdown reaches every loop,
//!   a stop reaches exactly one
//! - Lock sections only touch the map; cancellation and joins happen after the lock is released
//! - All removals are idempotent

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::watcher::{WatchExit, Watcher, WATCH_PANIC};
use crate::error::panic_message;
use crate::events::{Bus, Event};
use crate::tail::TailSourceRef;
use crate::watch::{Watch, WatchId, WatchInfo};

/// Handle to a running watch loop.
struct Handle {
    info: WatchInfo,
    join: JoinHandle<WatchExit>,
    cancel: CancellationToken,
}

/// Registry of active watches.
pub(crate) struct Registry {
    watches: RwLock<HashMap<WatchId, Handle>>,
    bus: Bus,
    runtime_token: CancellationToken,
    tails: TailSourceRef,
}

impl Registry {
    pub(crate) fn new(bus: Bus, runtime_token: CancellationToken, tails: TailSourceRef) -> Arc<Self> {
        Arc::new(Self {
            watches: RwLock::new(HashMap::new()),
            bus,
            runtime_token,
            tails,
        })
    }

    /// Registers `watch` and spawns its loop. Returns without waiting for the tail to open.
    pub(crate) async fn register(self: &Arc<Self>, watch: Watch) -> WatchInfo {
        let info = watch.info();
        let id = info.id;
        let token = self.runtime_token.child_token();
        let watcher = Watcher::new(watch, Arc::clone(&self.tails), self.bus.clone());

        self.bus.publish(Event::watch_added(&info));

        // Spawn and insert under one write lock: the loop's self-cleanup
        // cannot run before its entry exists.
        let mut watches = self.watches.write().await;
        let join = tokio::spawn(supervise(
            Arc::downgrade(self),
            self.bus.clone(),
            id,
            watcher,
            token.clone(),
        ));
        watches.insert(
            id,
            Handle {
                info: info.clone(),
                join,
                cancel: token,
            },
        );
        info
    }

    /// Stops one watch: cancel → join, giving up on the join after `wait`.
    /// Returns `false` if `id` was not registered.
    pub(crate) async fn remove(&self, id: WatchId, wait: Duration) -> bool {
        let Some(handle) = self.take_handle(id).await else {
            return false;
        };
        handle.cancel.cancel();
        if tokio::time::timeout(wait, handle.join).await.is_err() {
            tracing::warn!(watch = %id, ?wait, "watch loop did not stop in time; detached");
        }
        true
    }

    /// Takes every handle out of the registry and cancels them.
    pub(crate) async fn drain(&self) -> Vec<(WatchId, JoinHandle<WatchExit>)> {
        let handles: Vec<(WatchId, Handle)> = {
            let mut watches = self.watches.write().await;
            watches.drain().collect()
        };

        handles
            .into_iter()
            .map(|(id, h)| {
                h.cancel.cancel();
                (id, h.join)
            })
            .collect()
    }

    /// Returns sorted ids of active watches.
    pub(crate) async fn list(&self) -> Vec<WatchId> {
        let watches = self.watches.read().await;
        let mut ids: Vec<WatchId> = watches.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns projections of active watches, sorted by path then id.
    pub(crate) async fn infos(&self) -> Vec<WatchInfo> {
        let watches = self.watches.read().await;
        let mut infos: Vec<WatchInfo> = watches.values().map(|h| h.info.clone()).collect();
        infos.sort_unstable_by(|a, b| a.file_path.cmp(&b.file_path).then(a.id.cmp(&b.id)));
        infos
    }

    pub(crate) async fn contains(&self, id: WatchId) -> bool {
        self.watches.read().await.contains_key(&id)
    }

    pub(crate) async fn len(&self) -> usize {
        self.watches.read().await.len()
    }

    /// Drops the entry of a loop that ended on its own.
    async fn forget(&self, id: WatchId) {
        let _ = self.take_handle(id).await;
    }

    /// Atomically remove handle from registry.
    async fn take_handle(&self, id: WatchId) -> Option<Handle> {
        let mut watches = self.watches.write().await;
        watches.remove(&id)
    }
}

/// Runs one watch loop and removes the registry entry once the loop is over.
///
/// The loop handles panics of the tail it drives; anything that still unwinds
/// out of it (a panicking `Tail::stop`) is reported here as a terminal `TailStopped`.
async fn supervise(
    registry: Weak<Registry>,
    bus: Bus,
    id: WatchId,
    watcher: Watcher,
    token: CancellationToken,
) -> WatchExit {
    let exit = match AssertUnwindSafe(watcher.run(token)).catch_unwind().await {
        Ok(exit) => exit,
        Err(panic) => {
            tracing::warn!(watch = %id, panic = %panic_message(panic.as_ref()), "watch loop panicked");
            bus.publish(Event::tail_stopped(id).with_reason(WATCH_PANIC));
            WatchExit::Panicked
        }
    };

    if let Some(registry) = registry.upgrade() {
        registry.forget(id).await;
    }
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::tail::scripted::ScriptedSource;
    use std::path::{Path, PathBuf};

    const WAIT: Duration = Duration::from_secs(5);

    fn registry(source: &Arc<ScriptedSource>) -> (Arc<Registry>, Bus, CancellationToken) {
        let bus = Bus::new(256);
        let token = CancellationToken::new();
        let reg = Registry::new(bus.clone(), token.clone(), source.clone());
        (reg, bus, token)
    }

    async fn wait_until_empty(reg: &Registry) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while reg.len().await > 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("registry did not drain");
    }

    #[tokio::test]
    async fn remove_unknown_is_a_no_op() {
        let source = ScriptedSource::new();
        let (reg, _bus, _token) = registry(&source);
        let info = reg.register(Watch::new(WatchId::new(), PathBuf::from("/a.log"))).await;

        for _ in 0..3 {
            assert!(!reg.remove(WatchId::new(), WAIT).await);
        }
        assert_eq!(reg.list().await, vec![info.id]);
    }

    #[tokio::test]
    async fn remove_cancels_only_the_target() {
        let source = ScriptedSource::new();
        let (reg, bus, _token) = registry(&source);
        let mut rx = bus.subscribe();

        let a = reg.register(Watch::new(WatchId::new(), PathBuf::from("/a.log"))).await;
        let b = reg.register(Watch::new(WatchId::new(), PathBuf::from("/b.log"))).await;
        source.opened(Path::new("/a.log")).await;
        source.opened(Path::new("/b.log")).await;

        assert!(reg.remove(a.id, WAIT).await);
        assert!(!reg.remove(a.id, WAIT).await);

        assert_eq!(reg.list().await, vec![b.id]);
        assert!(reg.contains(b.id).await);
        assert_eq!(source.stops(), 1);

        let mut stopped = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::TailStopped {
                stopped.push(ev.watch);
            }
        }
        assert_eq!(stopped, vec![Some(a.id)]);
    }

    #[tokio::test]
    async fn open_failure_cleans_itself_up() {
        let source = ScriptedSource::new();
        let (reg, _bus, _token) = registry(&source);

        reg.register(Watch::new(WatchId::new(), PathBuf::from("/missing"))).await;
        wait_until_empty(&reg).await;
        assert_eq!(source.stops(), 0);
    }

    struct PanickingSource;

    struct PanickingTail;

    #[async_trait::async_trait]
    impl crate::tail::TailSource for PanickingSource {
        async fn open(
            &self,
            _path: &Path,
        ) -> Result<Box<dyn crate::tail::Tail>, crate::error::TailError> {
            Ok(Box::new(PanickingTail))
        }
    }

    impl crate::tail::Tail for PanickingTail {
        fn next(&mut self) -> futures::future::BoxFuture<'_, Option<crate::tail::LineRead>> {
            Box::pin(async { None })
        }

        fn stop(self: Box<Self>) -> futures::future::BoxFuture<'static, ()> {
            Box::pin(async { panic!("stop exploded") })
        }
    }

    #[tokio::test]
    async fn panic_while_stopping_becomes_tail_stopped() {
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let reg = Registry::new(bus.clone(), CancellationToken::new(), Arc::new(PanickingSource));

        let info = reg.register(Watch::new(WatchId::new(), PathBuf::from("/boom.log"))).await;
        wait_until_empty(&reg).await;

        let mut stopped = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::TailStopped {
                stopped.push(ev);
            }
        }
        assert_eq!(stopped.len(), 1);
        assert_eq!(stopped[0].watch, Some(info.id));
        assert_eq!(stopped[0].reason.as_deref(), Some("watch_panic"));
    }

    #[tokio::test]
    async fn runtime_cancel_reaches_every_watch() {
        let source = ScriptedSource::new();
        let (reg, _bus, token) = registry(&source);

        for name in ["/a.log", "/b.log", "/c.log"] {
            reg.register(Watch::new(WatchId::new(), PathBuf::from(name))).await;
            source.opened(Path::new(name)).await;
        }
        assert_eq!(reg.infos().await.len(), 3);

        token.cancel();
        for (_, join) in reg.drain().await {
            assert_eq!(join.await.unwrap(), WatchExit::Cancelled);
        }
        assert_eq!(source.stops(), 3);
        assert_eq!(reg.len().await, 0);
    }
}
