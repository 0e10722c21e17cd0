//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for Linux and macOS hosts:
//! - `MediaProbe` by shelling out to `ffprobe`
//! - `LibraryNotifier` as an HTTP call to a Jellyfin/Emby server via `reqwest`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FfprobeMediaProbe, HttpLibraryNotifier};
//! use std::time::Duration;
//!
//! let probe = FfprobeMediaProbe::new("ffprobe", Duration::from_secs(5));
//! let notifier = HttpLibraryNotifier::new("http://jellyfin:8096", "api-key", Duration::from_secs(10))?;
//! ```

mod notifier;
mod probe;

pub use notifier::HttpLibraryNotifier;
pub use probe::{parse_width_output, FfprobeMediaProbe};
