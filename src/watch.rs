//! # Watch identity and projections.
//!
//! - [`WatchId`]: opaque, globally unique token (UUID v4); never reused.
//! - [`Watch`]: one observation of a single file: identity + path.
//! - [`WatchInfo`]: read-only projection handed to consumers, recomputed on demand.
//!
//! The tail primitive is not part of [`Watch`]: it is opened and owned by the
//! watch loop (see `core::watcher`), so its lifetime ends with the loop.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

/// Stable identity of a watch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WatchId(Uuid);

impl WatchId {
    /// Allocates a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl From<Uuid> for WatchId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// One active observation of a single file.
#[derive(Clone, Debug)]
pub struct Watch {
    id: WatchId,
    path: PathBuf,
}

impl Watch {
    pub(crate) fn new(id: WatchId, path: PathBuf) -> Self {
        Self { id, path }
    }

    pub fn id(&self) -> WatchId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Projects this watch for external consumers.
    pub fn info(&self) -> WatchInfo {
        WatchInfo::new(self.id, self.path.clone())
    }
}

/// Read-only projection of a watch.
///
/// Serializes as `{ "id", "filePath", "fileName" }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchInfo {
    /// Identity of the watch.
    pub id: WatchId,
    /// Path of the observed file (empty when selection failed).
    pub file_path: PathBuf,
    /// Final path component of `file_path` (empty when there is none).
    pub file_name: String,
}

impl WatchInfo {
    pub(crate) fn new(id: WatchId, file_path: PathBuf) -> Self {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id,
            file_path,
            file_name,
        }
    }
}
