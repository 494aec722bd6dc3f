//! Scripted in-memory tail source for lifecycle tests.
//!
//! - paths named `missing` fail to open
//! - paths named `hang` never finish opening
//! - paths named `broken` panic while opening
//! - any other path opens a tail fed through [`ScriptedSource::push`]
//!   (or made to panic with [`ScriptedSource::explode`])

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

use super::source::{LineRead, Tail, TailSource};
use crate::error::TailError;

enum Step {
    Read(LineRead),
    Panic,
}

#[derive(Default)]
pub(crate) struct ScriptedSource {
    feeds: Mutex<HashMap<PathBuf, mpsc::UnboundedSender<Step>>>,
    stops: Arc<AtomicUsize>,
    opens: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of `Tail::stop` calls so far.
    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Number of successful opens so far.
    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Waits until `path` has been opened.
    pub(crate) async fn opened(&self, path: &Path) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.feeds.lock().unwrap().contains_key(path) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("tail was never opened");
    }

    /// Feeds one read result to the tail of `path`.
    pub(crate) fn push(&self, path: &Path, item: LineRead) {
        self.feed(path, Step::Read(item));
    }

    /// Makes the next read of `path` panic.
    pub(crate) fn explode(&self, path: &Path) {
        self.feed(path, Step::Panic);
    }

    fn feed(&self, path: &Path, step: Step) {
        if let Some(tx) = self.feeds.lock().unwrap().get(path) {
            let _ = tx.send(step);
        }
    }

    /// Ends the tail of `path` (`next()` yields `None`).
    pub(crate) fn close(&self, path: &Path) {
        self.feeds.lock().unwrap().remove(path);
    }
}

#[async_trait]
impl TailSource for ScriptedSource {
    async fn open(&self, path: &Path) -> Result<Box<dyn Tail>, TailError> {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("missing") => Err(TailError::Open {
                path: path.to_path_buf(),
                source: std::io::ErrorKind::NotFound.into(),
            }),
            Some("hang") => std::future::pending().await,
            Some("broken") => panic!("scripted open panicked"),
            _ => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.feeds.lock().unwrap().insert(path.to_path_buf(), tx);
                self.opens.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(ScriptedTail {
                    rx,
                    stops: Arc::clone(&self.stops),
                }))
            }
        }
    }
}

struct ScriptedTail {
    rx: mpsc::UnboundedReceiver<Step>,
    stops: Arc<AtomicUsize>,
}

impl Tail for ScriptedTail {
    fn next(&mut self) -> BoxFuture<'_, Option<LineRead>> {
        Box::pin(async move {
            match self.rx.recv().await? {
                Step::Read(item) => Some(item),
                Step::Panic => panic!("scripted tail panicked"),
            }
        })
    }

    fn stop(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            self.stops.fetch_add(1, Ordering::SeqCst);
        })
    }
}
