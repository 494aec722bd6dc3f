//! # File selection collaborator.
//!
//! [`FileSelector`] is the synchronous "pick a file" prompt consumed by
//! [`WatchManager::select_and_watch`](crate::WatchManager::select_and_watch).
//! Desktop dialogs, CLI prompts, and tests all plug in here.
//!
//! Built-in implementations:
//! - closures `Fn() -> Result<PathBuf, SelectError>`
//! - [`FixedSelector`]: always returns the same path
//! - [`StdinSelector`]: reads one path per call from standard input
//!
//! ## Example
//! ```rust
//! use std::path::PathBuf;
//! use tailvisor::{FileSelector, SelectError};
//!
//! let pick = || -> Result<PathBuf, SelectError> { Ok(PathBuf::from("/var/log/syslog")) };
//! assert_eq!(pick.select().unwrap(), PathBuf::from("/var/log/syslog"));
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::SelectError;

/// Synchronous path-selection prompt.
pub trait FileSelector: Send + Sync + 'static {
    /// Asks for a path. Returning an error means nothing will be watched.
    fn select(&self) -> Result<PathBuf, SelectError>;
}

/// Shared handle to a selector.
pub type FileSelectorRef = Arc<dyn FileSelector>;

impl<F> FileSelector for F
where
    F: Fn() -> Result<PathBuf, SelectError> + Send + Sync + 'static,
{
    fn select(&self) -> Result<PathBuf, SelectError> {
        (self)()
    }
}

/// Selector that always yields one path.
#[derive(Clone, Debug)]
pub struct FixedSelector {
    path: PathBuf,
}

impl FixedSelector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FileSelector for FixedSelector {
    fn select(&self) -> Result<PathBuf, SelectError> {
        Ok(self.path.clone())
    }
}

/// Selector that reads one line from stdin per call.
///
/// An empty line or end of input counts as a cancelled selection.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdinSelector;

impl FileSelector for StdinSelector {
    fn select(&self) -> Result<PathBuf, SelectError> {
        read_path(&mut std::io::stdin().lock())
    }
}

/// Selector used when none was configured.
pub(crate) struct NoSelector;

impl FileSelector for NoSelector {
    fn select(&self) -> Result<PathBuf, SelectError> {
        Err(SelectError::Other("no file selector configured".into()))
    }
}

fn read_path(input: &mut impl BufRead) -> Result<PathBuf, SelectError> {
    let mut line = String::new();
    let n = input.read_line(&mut line)?;
    let trimmed = line.trim();
    if n == 0 || trimmed.is_empty() {
        tracing::debug!("stdin selector: no path entered");
        return Err(SelectError::Cancelled);
    }
    Ok(PathBuf::from(trimmed))
}
