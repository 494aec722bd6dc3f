//! # Built-in sinks
//!
//! - [`LogWriter`]: renders events through `tracing` (demo/debug).

mod log;

pub use log::LogWriter;
