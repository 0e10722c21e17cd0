//! Media Inspection Abstraction
//!
//! The resolution classifier falls back to inspecting the media itself when
//! no naming hint is available. Inspection is slow and may be unavailable on
//! the host, so the core only ever sees it through this trait.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Reads stream properties from a media file.
///
/// Implementations must bound their own runtime: an inspection that has not
/// finished within the configured timeout should return
/// [`BridgeError::Timeout`](crate::error::BridgeError::Timeout) instead of
/// blocking the sync pass.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::probe::MediaProbe;
///
/// async fn width_of(probe: &dyn MediaProbe, path: &std::path::Path) -> Option<u32> {
///     probe.video_width(path).await.ok()
/// }
/// ```
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Width in pixels of the first video stream of the file at `path`.
    async fn video_width(&self, path: &Path) -> Result<u32>;
}
