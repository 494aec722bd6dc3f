//! # Polling tail
//!
//! [`PollingTails`] opens files and follows them by polling, which behaves the
//! same on local disks, network mounts, and filesystems without change
//! notifications.
//!
//! ## Reader loop
//! ```text
//! open(path) ──► metadata (must be a regular file) ──► spawn reader
//!
//! reader loop {
//!   ├─► len < offset ?  → truncated: seek(0), drop partial line
//!   ├─► read chunk
//!   │     ├─ 0 bytes  → sleep(poll_interval)
//!   │     ├─ n bytes  → split on '\n', send complete lines (in order)
//!   │     └─ error    → send Err(Read), sleep(poll_interval)
//!   └─► exit on stop() or when the receiver is gone
//! }
//! ```
//!
//! ## Rules
//! - Trailing `\n` / `\r\n` are stripped; invalid UTF-8 is decoded lossily.
//! - A partial last line is held back until its newline arrives.
//! - The line channel is bounded (`Config::line_buffer`); the reader waits when it is full.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::source::{LineRead, Tail, TailSource};
use super::TailStart;
use crate::core::Config;
use crate::error::TailError;

const CHUNK: usize = 8 * 1024;

/// Default [`TailSource`]: polls files for appended data.
#[derive(Clone, Debug)]
pub struct PollingTails {
    poll_interval: Duration,
    line_buffer: usize,
    start: TailStart,
}

impl PollingTails {
    /// Creates a source from the runtime config.
    pub fn new(cfg: &Config) -> Self {
        Self {
            poll_interval: cfg.poll_interval_clamped(),
            line_buffer: cfg.line_buffer_clamped(),
            start: cfg.start,
        }
    }
}

impl Default for PollingTails {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[async_trait]
impl TailSource for PollingTails {
    async fn open(&self, path: &Path) -> Result<Box<dyn Tail>, TailError> {
        let open_err = |source| TailError::Open {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).await.map_err(open_err)?;
        let meta = file.metadata().await.map_err(open_err)?;
        if !meta.is_file() {
            return Err(TailError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let offset = match self.start {
            TailStart::Beginning => 0,
            TailStart::End => meta.len(),
        };
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await.map_err(open_err)?;
        }

        let (tx, rx) = mpsc::channel(self.line_buffer);
        let cancel = CancellationToken::new();
        let reader = Reader {
            path: path.to_path_buf(),
            file,
            offset,
            pending: Vec::new(),
            poll_interval: self.poll_interval,
            tx,
        };
        let handle = tokio::spawn(reader.run(cancel.clone()));

        Ok(Box::new(PollingTail {
            lines: rx,
            cancel: cancel.clone(),
            _guard: cancel.drop_guard(),
            reader: handle,
        }))
    }
}

/// A file being followed by a background reader task.
pub struct PollingTail {
    lines: mpsc::Receiver<LineRead>,
    cancel: CancellationToken,
    /// Cancels the reader if the tail is dropped without `stop()`.
    _guard: DropGuard,
    reader: JoinHandle<()>,
}

impl Tail for PollingTail {
    fn next(&mut self) -> BoxFuture<'_, Option<LineRead>> {
        Box::pin(self.lines.recv())
    }

    fn stop(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            self.cancel.cancel();
            let _ = self.reader.await;
        })
    }
}

struct Reader {
    path: PathBuf,
    file: File,
    offset: u64,
    pending: Vec<u8>,
    poll_interval: Duration,
    tx: mpsc::Sender<LineRead>,
}

impl Reader {
    async fn run(mut self, cancel: CancellationToken) {
        let mut buf = vec![0u8; CHUNK];

        loop {
            if let Err(e) = self.rewind_if_truncated().await {
                if !self.send(Err(e), &cancel).await || !self.idle(&cancel).await {
                    return;
                }
                continue;
            }

            let read = tokio::select! {
                _ = cancel.cancelled() => return,
                r = self.file.read(&mut buf) => r,
            };

            let keep_going = match read {
                Ok(0) => self.idle(&cancel).await,
                Ok(n) => {
                    self.offset += n as u64;
                    self.pending.extend_from_slice(&buf[..n]);
                    self.flush_lines(&cancel).await
                }
                Err(source) => {
                    let err = TailError::Read {
                        path: self.path.clone(),
                        source,
                    };
                    self.send(Err(err), &cancel).await && self.idle(&cancel).await
                }
            };
            if !keep_going {
                return;
            }
        }
    }

    /// Restarts from the beginning when the file shrank below the read offset.
    async fn rewind_if_truncated(&mut self) -> Result<(), TailError> {
        let read_err = |source| TailError::Read {
            path: self.path.clone(),
            source,
        };

        let len = self.file.metadata().await.map_err(read_err)?.len();
        if len < self.offset {
            self.file.seek(SeekFrom::Start(0)).await.map_err(read_err)?;
            self.offset = 0;
            self.pending.clear();
        }
        Ok(())
    }

    /// Sends every complete line held in `pending`.
    async fn flush_lines(&mut self, cancel: &CancellationToken) -> bool {
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            if !self.send(Ok(decode_line(&raw)), cancel).await {
                return false;
            }
        }
        true
    }

    /// Returns `false` when the reader should exit.
    async fn send(&self, item: LineRead, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            r = self.tx.send(item) => r.is_ok(),
        }
    }

    /// Waits one poll interval. Returns `false` when the reader should exit.
    async fn idle(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = self.tx.closed() => false,
            _ = tokio::time::sleep(self.poll_interval) => true,
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && raw[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fast() -> PollingTails {
        PollingTails::new(&Config {
            poll_interval: Duration::from_millis(10),
            ..Config::default()
        })
    }

    async fn next_line(tail: &mut Box<dyn Tail>) -> String {
        tokio::time::timeout(Duration::from_secs(5), tail.next())
            .await
            .expect("timed out waiting for a line")
            .expect("tail ended")
            .expect("read error")
    }

    fn append(path: &Path, text: &str) {
        let mut f = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f.flush().unwrap();
    }

    #[test]
    fn decode_strips_line_endings() {
        assert_eq!(decode_line(b"abc\n"), "abc");
        assert_eq!(decode_line(b"abc\r\n"), "abc");
        assert_eq!(decode_line(b"\n"), "");
        assert_eq!(decode_line(b"a\xffb\n"), "a\u{fffd}b");
    }

    #[tokio::test]
    async fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = fast().open(&dir.path().join("nope.log")).await.err().unwrap();
        assert_eq!(err.as_label(), "tail_open");
    }

    #[tokio::test]
    async fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = fast().open(dir.path()).await.err().unwrap();
        assert_eq!(err.as_label(), "tail_not_a_file");
    }

    #[tokio::test]
    async fn reads_existing_then_appended_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "one\ntwo\n").unwrap();

        let mut tail = fast().open(&path).await.unwrap();
        assert_eq!(next_line(&mut tail).await, "one");
        assert_eq!(next_line(&mut tail).await, "two");

        append(&path, "three\r\nfour\n");
        assert_eq!(next_line(&mut tail).await, "three");
        assert_eq!(next_line(&mut tail).await, "four");

        tail.stop().await;
    }

    #[tokio::test]
    async fn partial_line_waits_for_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "hel").unwrap();

        let mut tail = fast().open(&path).await.unwrap();
        let early = tokio::time::timeout(Duration::from_millis(100), tail.next()).await;
        assert!(early.is_err(), "partial line must not be emitted");

        append(&path, "lo\n");
        assert_eq!(next_line(&mut tail).await, "hello");
        tail.stop().await;
    }

    #[tokio::test]
    async fn start_at_end_skips_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "old\n").unwrap();

        let source = PollingTails::new(&Config {
            poll_interval: Duration::from_millis(10),
            start: TailStart::End,
            ..Config::default()
        });
        let mut tail = source.open(&path).await.unwrap();

        append(&path, "new\n");
        assert_eq!(next_line(&mut tail).await, "new");
        tail.stop().await;
    }

    #[tokio::test]
    async fn truncation_restarts_from_the_beginning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "a long first line\n").unwrap();

        let mut tail = fast().open(&path).await.unwrap();
        assert_eq!(next_line(&mut tail).await, "a long first line");

        std::fs::write(&path, "new\n").unwrap();
        assert_eq!(next_line(&mut tail).await, "new");
        tail.stop().await;
    }
}
