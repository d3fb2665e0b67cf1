//! Single-writer async runtime and event stream.

/// Event stream types emitted by the runtime.
pub mod events;
/// Handle and command loop implementation.
pub mod handle;

pub use events::LogEvent;
pub use handle::{LogbookHandle, RuntimeConfig, RuntimeError, spawn_logbook};
