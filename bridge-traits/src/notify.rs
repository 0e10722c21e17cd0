//! Library Refresh Notification
//!
//! After a sync run that changed the mirror, the host media server is asked to
//! rescan its library. Delivery is best-effort: failures are logged by the
//! caller and never fail the run.

use async_trait::async_trait;

use crate::error::Result;

/// Asks a downstream media server to rescan its libraries.
#[async_trait]
pub trait LibraryNotifier: Send + Sync {
    /// Request a library refresh.
    async fn request_refresh(&self) -> Result<()>;
}
