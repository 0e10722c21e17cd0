//! Media mirror workspace crate.
//!
//! Re-exports the service façade so hosts can depend on `media-mirror` alone
//! and enable the documented features (`desktop-shims`) without wiring each
//! workspace crate individually. The `media-sync` binary is built on top of
//! this surface.

pub use core_runtime::config::{
    CoreConfig, LibraryConfig, NotifierConfig, ProbeConfig, ScheduleConfig, SourceConfig,
    WatchConfig,
};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
pub use core_service::{CoreError, LibraryKind, LibraryOutcome, MirrorService, SyncMode, SyncRun};
pub use core_sync::{ProgressLine, ProgressSink};
