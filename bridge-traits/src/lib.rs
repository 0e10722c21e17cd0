//! # Host Bridge Traits
//!
//! Capabilities the sync engine needs from its host but cannot provide
//! itself.
//!
//! ## Traits
//!
//! - [`MediaProbe`](probe::MediaProbe) - Inspect a media file's video stream
//! - [`LibraryNotifier`](notify::LibraryNotifier) - Ask a media server to rescan
//! - [`Clock`](time::Clock) - Time source for deterministic watermarks
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to a host
//!
//! Concrete desktop adapters live in `bridge-desktop`.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. A
//! failing bridge call never aborts a sync pass: the engine degrades (the
//! classifier falls through to the default resolution, the notifier logs and
//! moves on).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter can be shared
//! by every library and background loop.

pub mod error;
pub mod notify;
pub mod probe;
pub mod time;

pub use error::BridgeError;

pub use notify::LibraryNotifier;
pub use probe::MediaProbe;
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
