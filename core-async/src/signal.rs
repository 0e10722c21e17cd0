//! Process signals for binaries that run until interrupted.

pub use tokio::signal::ctrl_c;

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it.
pub async fn shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}
