//! # Tail primitive: incremental line reading of one file.
//!
//! - [`TailSource`] / [`Tail`]: the seam the watch loop drives
//! - [`PollingTails`] / [`PollingTail`]: default polling implementation
//! - [`TailStart`]: where a new tail starts reading

mod polling;
mod source;

#[cfg(test)]
pub(crate) mod scripted;

pub use polling::{PollingTail, PollingTails};
pub use source::{LineRead, Tail, TailSource, TailSourceRef};

/// Where a freshly opened tail starts reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TailStart {
    /// Emit the existing content first, then follow (default).
    #[default]
    Beginning,
    /// Skip existing content; only lines appended after opening are emitted.
    End,
}
