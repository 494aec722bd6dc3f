//! Error types used by the tailvisor runtime, the tail primitive, and file selection.
//!
//! This module defines:
//!
//! - [`SelectError`]: the file-selection collaborator failed or was cancelled.
//! - [`SelectionFailed`]: what [`WatchManager::select_and_watch`](crate::WatchManager::select_and_watch)
//!   returns on selection failure (carries the identity that was allocated).
//! - [`TailError`]: open/read failures of a tail primitive.
//! - [`RuntimeError`]: errors raised by the orchestration runtime itself.
//!
//! All of them provide `as_label` for logs/metrics.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::watch::{WatchId, WatchInfo};

/// # Errors produced by the tailvisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some watch loops did not finish in time.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Watches whose loops were still running when the grace period ended.
        stuck: Vec<WatchId>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tailvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Errors produced by a file-selection collaborator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SelectError {
    /// The operator dismissed the prompt without choosing a file.
    #[error("file selection cancelled")]
    Cancelled,

    /// The prompt itself failed.
    #[error("file selection i/o: {0}")]
    Io(#[from] std::io::Error),

    /// Any other collaborator-specific failure.
    #[error("file selection failed: {0}")]
    Other(String),
}

impl SelectError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SelectError::Cancelled => "select_cancelled",
            SelectError::Io(_) => "select_io",
            SelectError::Other(_) => "select_failed",
        }
    }
}

/// Returned by [`WatchManager::select_and_watch`](crate::WatchManager::select_and_watch)
/// when no path was selected.
///
/// `info` carries the identity that was allocated for the attempt and an empty path.
/// No watch was registered for it.
#[derive(Error, Debug)]
#[error("watch {}: {source}", .info.id)]
pub struct SelectionFailed {
    /// Projection of the watch that was never started.
    pub info: WatchInfo,
    /// The underlying selection error.
    #[source]
    pub source: SelectError,
}

/// # Errors produced by a tail primitive.
///
/// `Open` and `NotAFile` end a watch before it reads anything (`tail-error`);
/// `Read` is reported per read cycle (`read-error`) and the watch keeps going.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TailError {
    /// The file could not be opened.
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The path exists but is not a regular file.
    #[error("{} is not a regular file", .path.display())]
    NotAFile { path: PathBuf },

    /// A single read cycle failed.
    #[error("read from {} failed: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TailError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tailvisor::TailError;
    ///
    /// let err = TailError::NotAFile { path: "/tmp".into() };
    /// assert_eq!(err.as_label(), "tail_not_a_file");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TailError::Open { .. } => "tail_open",
            TailError::NotAFile { .. } => "tail_not_a_file",
            TailError::Read { .. } => "tail_read",
        }
    }

    /// Indicates whether the watch may keep reading after this error.
    ///
    /// A watch ends after reporting a non-transient error.
    pub fn is_transient(&self) -> bool {
        matches!(self, TailError::Read { .. })
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_failed_names_the_allocated_watch() {
        let info = WatchInfo::new(WatchId::new(), PathBuf::new());
        let id = info.id;
        let err = SelectionFailed {
            info,
            source: SelectError::Cancelled,
        };

        assert_eq!(err.to_string(), format!("watch {id}: file selection cancelled"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn only_read_errors_are_transient() {
        let read = TailError::Read {
            path: "a.log".into(),
            source: std::io::Error::other("boom"),
        };
        let open = TailError::Open {
            path: "a.log".into(),
            source: std::io::ErrorKind::NotFound.into(),
        };

        assert!(read.is_transient());
        assert!(!open.is_transient());
        assert!(!TailError::NotAFile { path: "/".into() }.is_transient());
    }
}
