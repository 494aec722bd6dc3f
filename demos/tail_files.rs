//! # Example: tail_files
//!
//! Follows files and logs every event through the built-in [`LogWriter`].
//!
//! Shows how to:
//! - Build a [`WatchManager`] with sinks and a file selector.
//! - Start watches from paths given on the command line, or from a path typed on stdin.
//! - Stop on Ctrl-C / SIGTERM with a bounded grace period.
//!
//! ## Flow
//! ```text
//! args / stdin ──► watch_path / select_and_watch
//!     ├─► publish(WatchAdded)
//!     ├─► Watcher::run()
//!     │     └─► publish(FileUpdate / ReadError / TailError / TailStopped)
//!     └─► sink listener ──► SinkSet.deliver() ──► LogWriter.on_event()
//!
//! SIGINT ──► run_until_signal() ──► shutdown_with_grace()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example tail_files --features logging -- /var/log/syslog
//! echo /tmp/app.log | cargo run --example tail_files --features logging
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use tailvisor::{Config, LogWriter, Sink, StdinSelector, TailStart, WatchManager};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config {
        grace: Duration::from_secs(3),
        poll_interval: Duration::from_millis(200),
        start: TailStart::End,
        ..Config::default()
    };

    let sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(LogWriter::new())];
    let manager = WatchManager::builder(cfg)
        .with_sinks(sinks)
        .with_selector(StdinSelector)
        .build();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        println!("path to follow:");
        if let Err(e) = manager.select_and_watch().await {
            eprintln!("nothing to watch: {e}");
            manager.shutdown_with_grace().await?;
            return Ok(());
        }
    } else {
        for path in paths {
            manager.watch_path(path).await;
        }
    }

    for info in manager.watches().await {
        println!("watching {} ({})", info.file_path.display(), info.id);
    }

    manager.run_until_signal().await?;
    Ok(())
}
