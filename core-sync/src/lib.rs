//! # Media Mirror Engine
//!
//! Mirrors symlinked media from one or more source mounts into a destination
//! tree whose filenames carry a resolution tag.
//!
//! ## Overview
//!
//! A pass walks a source root for symbolic links (newest first), classifies
//! each untagged entry's resolution, renames the source link once to embed the
//! label, and publishes an atomic symlink at the mirrored destination path.
//! Incremental passes are bounded by a persisted per-source watermark.
//!
//! ## Components
//!
//! - **Scanner** (`scanner`): symlink discovery and tree fingerprints
//! - **Classifier** (`classifier`): ordered resolution tiers with a probe fallback
//! - **Tagger** (`tagger`): one-time rename of a source link to its tagged name
//! - **Publisher** (`publisher`): atomic, non-overwriting destination links
//! - **Watermark** (`watermark`): per-source incremental cursor
//! - **Orchestrator** (`orchestrator`): one pass over one source
//! - **Library** (`library`): ordered multi-source merge into one destination
//! - **Watcher** (`watcher`): fingerprint polling that triggers passes
//! - **Scheduler** (`scheduler`): periodic passes with cooperative stop
//! - **Browse** (`browse`): read-only destination listing

pub mod browse;
pub mod classifier;
pub mod error;
pub mod job;
pub mod library;
pub mod location;
pub mod orchestrator;
pub mod progress;
pub mod publisher;
pub mod scanner;
pub mod scheduler;
pub mod source;
pub mod tagger;
pub mod watcher;
pub mod watermark;

pub use error::{Result, SyncError};

pub use browse::DestinationBrowser;
pub use classifier::{Classification, ClassificationTier, Classifier, ResolutionStrategy};
pub use job::{EpisodeCode, SyncMode, SyncRun};
pub use library::{Library, LibraryOutcome, SourceFailure};
pub use location::MediaLocation;
pub use orchestrator::{Orchestrator, PassOutcome};
pub use progress::{
    ChannelSink, CollectingSink, DiscardSink, PassStats, ProgressEvent, ProgressLine, ProgressSink,
};
pub use publisher::PublishOutcome;
pub use scanner::SymlinkEntry;
pub use scheduler::{ScheduledPass, SyncScheduler};
pub use source::{LibraryKind, MediaSource, Resolution};
pub use watcher::{ChangeHandler, ChangeWatcher, WatchTarget};
pub use watermark::{WatermarkReport, WatermarkStore};
