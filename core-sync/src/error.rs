use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Broken symlink {path}: {reason}")]
    BrokenLink { path: PathBuf, reason: String },

    #[error("Source vanished before tagging: {path}")]
    RenameRace { path: PathBuf },

    #[error("Rename failed {path} -> {tagged}: {source}")]
    Rename {
        path: PathBuf,
        tagged: String,
        #[source]
        source: io::Error,
    },

    #[error("Tagged name already exists: {path}")]
    TagConflict { path: PathBuf },

    #[error("Probe failed for {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("Link failed: {path}: {source}")]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Watermark I/O failed for {path}: {source}")]
    WatermarkIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    Wipe {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unexpected layout for {path}: {reason}")]
    UnexpectedLayout { path: PathBuf, reason: String },

    #[error("Refresh already in progress for {library} '{title}'")]
    RefreshInProgress { library: String, title: String },

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    #[error("Invalid library kind: {0}")]
    InvalidLibraryKind(String),

    #[error("Invalid sync mode: {0}")]
    InvalidSyncMode(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SyncError {
    /// Entry-level conditions are recovered inside a pass: the entry is
    /// reported and skipped. Everything else ends the pass.
    pub fn is_entry_level(&self) -> bool {
        matches!(
            self,
            SyncError::BrokenLink { .. }
                | SyncError::RenameRace { .. }
                | SyncError::Rename { .. }
                | SyncError::TagConflict { .. }
                | SyncError::Probe { .. }
                | SyncError::Publish { .. }
                | SyncError::UnexpectedLayout { .. }
        )
    }
}

impl From<core_async::task::JoinError> for SyncError {
    fn from(err: core_async::task::JoinError) -> Self {
        SyncError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
