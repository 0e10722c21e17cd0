use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("No {0} library configured")]
    LibraryNotConfigured(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<core_async::task::JoinError> for CoreError {
    fn from(err: core_async::task::JoinError) -> Self {
        CoreError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
