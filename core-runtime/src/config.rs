//! # Core Configuration Module
//!
//! Provides configuration management for the media mirror.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the library layout, background loop tuning and the
//! bridge implementations the engine needs. It enforces fail-fast validation
//! so a misconfigured daemon refuses to start instead of mirroring into the
//! wrong place.
//!
//! ## Bridges (with platform defaults)
//!
//! - `MediaProbe` - Resolution probe (desktop default: `ffprobe` subprocess)
//! - `LibraryNotifier` - Media server rescan (desktop default: HTTP, only when
//!   a [`NotifierConfig`] is supplied)
//! - `Clock` - Time source for watermarks (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for
//! `MediaProbe` and `LibraryNotifier` are injected automatically if not
//! provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, LibraryConfig, SourceConfig};
//!
//! let config = CoreConfig::builder()
//!     .state_dir("/data/cache")
//!     .library(
//!         LibraryConfig::movies("/media/movies")
//!             .with_source(SourceConfig::new("movies-4k", "/mnt/debrid/riven_symlinks/movies", "2160p"))
//!             .with_source(
//!                 SourceConfig::new("movies-1080", "/mnt/debrid_1080/riven_symlinks/movies", "1080p")
//!                     .with_priority(1),
//!             ),
//!     )
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder validates the layout and provides actionable error messages:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No libraries configured
//! let config = CoreConfig::builder()
//!     .state_dir("/data/cache")
//!     .build()
//!     .expect("Should fail - no libraries");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, LibraryNotifier, MediaProbe, SystemClock};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Resolution labels (and their aliases) accepted in source configuration.
const RESOLUTION_LABELS: &[&str] = &["2160p", "2160", "4k", "uhd", "1080p", "1080", "720p", "720"];

/// Library kinds accepted in library configuration.
const LIBRARY_KINDS: &[&str] = &["movies", "tv"];

/// Core configuration for the media mirror.
///
/// This struct holds all settings and bridges required to run sync passes.
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Directory holding per-source watermark files
    pub state_dir: PathBuf,

    /// Logical libraries, each mirrored into its own destination
    pub libraries: Vec<LibraryConfig>,

    /// External probe settings
    pub probe: ProbeConfig,

    /// Periodic scheduler settings
    pub scheduler: ScheduleConfig,

    /// Change watcher settings
    pub watcher: WatchConfig,

    /// Media server notification settings
    pub notifier: Option<NotifierConfig>,

    /// Feature flags
    pub features: FeatureFlags,

    /// Media probe used as the fourth classification tier (optional)
    pub media_probe: Option<Arc<dyn MediaProbe>>,

    /// Library refresh notifier (optional)
    pub library_notifier: Option<Arc<dyn LibraryNotifier>>,

    /// Time source for watermarks
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("state_dir", &self.state_dir)
            .field("libraries", &self.libraries)
            .field("probe", &self.probe)
            .field("scheduler", &self.scheduler)
            .field("watcher", &self.watcher)
            .field("notifier", &self.notifier)
            .field("features", &self.features)
            .field(
                "media_probe",
                &self.media_probe.as_ref().map(|_| "MediaProbe { ... }"),
            )
            .field(
                "library_notifier",
                &self
                    .library_notifier
                    .as_ref()
                    .map(|_| "LibraryNotifier { ... }"),
            )
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Run periodic passes over every library
    pub enable_scheduler: bool,

    /// Poll source roots and re-sync on change
    pub enable_watcher: bool,

    /// Inspect media with the external probe when naming gives no hint
    pub enable_probe: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_scheduler: true,
            enable_watcher: false,
            enable_probe: true,
        }
    }
}

// ============================================================================
// Library layout
// ============================================================================

/// One physical mount contributing to a logical library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Unique name; also the default watermark file stem
    pub name: String,
    /// Root of the source tree
    pub root: PathBuf,
    /// Resolution label used when classification finds nothing
    pub default_resolution: String,
    /// Lower runs first within a library
    pub priority: u32,
    /// Explicit watermark file, overriding `<state_dir>/<name>.last`
    pub watermark_file: Option<PathBuf>,
}

impl SourceConfig {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        default_resolution: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            default_resolution: default_resolution.into(),
            priority: 0,
            watermark_file: None,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_watermark_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.watermark_file = Some(path.into());
        self
    }

    /// Where this source's watermark lives.
    pub fn watermark_path(&self, state_dir: &Path) -> PathBuf {
        self.watermark_file
            .clone()
            .unwrap_or_else(|| state_dir.join(format!("{}.last", self.name)))
    }
}

/// A logical library (movies or TV) and the sources feeding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// `"movies"` or `"tv"`
    pub kind: String,
    /// Destination root the media server reads
    pub destination: PathBuf,
    /// Contributing sources
    pub sources: Vec<SourceConfig>,
}

impl LibraryConfig {
    pub fn new(kind: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            kind: kind.into(),
            destination: destination.into(),
            sources: Vec::new(),
        }
    }

    pub fn movies(destination: impl Into<PathBuf>) -> Self {
        Self::new("movies", destination)
    }

    pub fn tv(destination: impl Into<PathBuf>) -> Self {
        Self::new("tv", destination)
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.sources.push(source);
        self
    }
}

// ============================================================================
// Background loops and bridges
// ============================================================================

/// External media probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Program to invoke
    pub program: PathBuf,
    /// Upper bound on a single inspection
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffprobe"),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Periodic scheduler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Delay between the end of one iteration and the start of the next
    pub interval: Duration,
    /// Every Nth iteration runs in full mode; `None` keeps every pass incremental
    pub full_pass_every: Option<u32>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            full_pass_every: None,
        }
    }
}

/// Change watcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    pub poll_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(15),
        }
    }
}

/// Media server notification settings.
#[derive(Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl NotifierConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder();
    /// ```
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - State directory is not empty
    /// - At least one library, each with a destination and a source
    /// - At most one library per kind
    /// - Source names are unique across all libraries
    /// - Kinds and resolution labels are known
    /// - Intervals and timeouts are non-zero
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.state_dir.as_os_str().is_empty() {
            return Err(Error::Config("State directory cannot be empty".to_string()));
        }

        if self.libraries.is_empty() {
            return Err(Error::Config(
                "At least one library is required. Use .library() to add one.".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut kinds = HashSet::new();
        for library in &self.libraries {
            if !LIBRARY_KINDS.contains(&library.kind.as_str()) {
                return Err(Error::Config(format!(
                    "Unknown library kind '{}'; expected one of {:?}",
                    library.kind, LIBRARY_KINDS
                )));
            }

            if !kinds.insert(library.kind.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate library kind '{}'; add sources to the existing library instead",
                    library.kind
                )));
            }

            if library.destination.as_os_str().is_empty() {
                return Err(Error::Config(format!(
                    "Library '{}' has an empty destination",
                    library.kind
                )));
            }

            if library.sources.is_empty() {
                return Err(Error::Config(format!(
                    "Library '{}' has no sources",
                    library.kind
                )));
            }

            for source in &library.sources {
                if source.name.trim().is_empty() {
                    return Err(Error::Config("Source name cannot be empty".to_string()));
                }

                if !names.insert(source.name.as_str()) {
                    return Err(Error::Config(format!(
                        "Duplicate source name '{}'",
                        source.name
                    )));
                }

                if source.root.as_os_str().is_empty() {
                    return Err(Error::Config(format!(
                        "Source '{}' has an empty root",
                        source.name
                    )));
                }

                let label = source.default_resolution.trim().to_ascii_lowercase();
                if !RESOLUTION_LABELS.contains(&label.as_str()) {
                    return Err(Error::Config(format!(
                        "Source '{}' has unknown default resolution '{}'; expected one of {:?}",
                        source.name, source.default_resolution, RESOLUTION_LABELS
                    )));
                }
            }
        }

        if self.probe.timeout.is_zero() {
            return Err(Error::Config(
                "Probe timeout must be greater than 0".to_string(),
            ));
        }

        if self.scheduler.interval.is_zero() {
            return Err(Error::Config(
                "Scheduler interval must be greater than 0".to_string(),
            ));
        }

        if self.scheduler.full_pass_every == Some(0) {
            return Err(Error::Config(
                "full_pass_every must be at least 1 when set".to_string(),
            ));
        }

        if self.watcher.poll_interval.is_zero() {
            return Err(Error::Config(
                "Watcher poll interval must be greater than 0".to_string(),
            ));
        }

        if let Some(notifier) = &self.notifier {
            if notifier.base_url.trim().is_empty() {
                return Err(Error::Config(
                    "Notifier base URL cannot be empty".to_string(),
                ));
            }
            if notifier.timeout.is_zero() {
                return Err(Error::Config(
                    "Notifier timeout must be greater than 0".to_string(),
                ));
            }
        }

        if self.features.enable_probe && self.media_probe.is_none() {
            return Err(Error::Config(
                "Probe enabled but no MediaProbe provided. \
                 Disable the feature or inject a MediaProbe implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn media_probe_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaProbe".to_string(),
        message: "MediaProbe implementation is required when the probe tier is enabled. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default FfprobeMediaProbe. \
                 Otherwise: inject an implementation or disable the probe feature."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn library_notifier_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "LibraryNotifier".to_string(),
        message: "A notifier endpoint is configured but no LibraryNotifier is available. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default HttpLibraryNotifier."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_media_probe(probe: &ProbeConfig) -> Result<Arc<dyn MediaProbe>> {
    use bridge_desktop::FfprobeMediaProbe;

    let probe: Arc<dyn MediaProbe> =
        Arc::new(FfprobeMediaProbe::new(probe.program.clone(), probe.timeout));
    Ok(probe)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_media_probe(_probe: &ProbeConfig) -> Result<Arc<dyn MediaProbe>> {
    Err(media_probe_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_library_notifier(
    notifier: &NotifierConfig,
) -> Result<Arc<dyn LibraryNotifier>> {
    use bridge_desktop::HttpLibraryNotifier;

    let notifier =
        HttpLibraryNotifier::new(&notifier.base_url, notifier.api_key.clone(), notifier.timeout)
            .map_err(|e| Error::Internal(format!("Failed to initialize notifier: {}", e)))?;
    let notifier: Arc<dyn LibraryNotifier> = Arc::new(notifier);
    Ok(notifier)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_library_notifier(
    _notifier: &NotifierConfig,
) -> Result<Arc<dyn LibraryNotifier>> {
    Err(library_notifier_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    state_dir: Option<PathBuf>,
    libraries: Vec<LibraryConfig>,
    probe: Option<ProbeConfig>,
    scheduler: Option<ScheduleConfig>,
    watcher: Option<WatchConfig>,
    notifier: Option<NotifierConfig>,
    features: Option<FeatureFlags>,
    media_probe: Option<Arc<dyn MediaProbe>>,
    library_notifier: Option<Arc<dyn LibraryNotifier>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Sets the directory holding watermark files.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .state_dir("/data/cache");
    /// ```
    pub fn state_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.state_dir = Some(path.into());
        self
    }

    /// Adds a logical library.
    pub fn library(mut self, library: LibraryConfig) -> Self {
        self.libraries.push(library);
        self
    }

    /// Sets the external probe program and timeout.
    pub fn probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Sets scheduler tuning.
    ///
    /// Default: every 300 seconds, incremental only.
    pub fn scheduler(mut self, scheduler: ScheduleConfig) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sets watcher tuning.
    ///
    /// Default: poll every 15 seconds.
    pub fn watcher(mut self, watcher: WatchConfig) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Configures the media server to notify after changed runs.
    pub fn notifier(mut self, notifier: NotifierConfig) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = Some(features);
        self
    }

    pub fn enable_scheduler(mut self, enable: bool) -> Self {
        self.features.get_or_insert_with(FeatureFlags::default).enable_scheduler = enable;
        self
    }

    pub fn enable_watcher(mut self, enable: bool) -> Self {
        self.features.get_or_insert_with(FeatureFlags::default).enable_watcher = enable;
        self
    }

    pub fn enable_probe(mut self, enable: bool) -> Self {
        self.features.get_or_insert_with(FeatureFlags::default).enable_probe = enable;
        self
    }

    /// Injects a media probe, replacing the desktop default.
    pub fn media_probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.media_probe = Some(probe);
        self
    }

    /// Injects a library notifier, replacing the desktop default.
    pub fn library_notifier(mut self, notifier: Arc<dyn LibraryNotifier>) -> Self {
        self.library_notifier = Some(notifier);
        self
    }

    /// Injects a clock, replacing the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the configuration, injecting platform defaults for missing
    /// bridges, and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid settings and
    /// [`Error::CapabilityMissing`] when an enabled feature has no bridge and
    /// no desktop default is compiled in.
    pub fn build(self) -> Result<CoreConfig> {
        let state_dir = self.state_dir.ok_or_else(|| {
            Error::Config("State directory is required. Use .state_dir() to set it.".to_string())
        })?;

        let probe = self.probe.unwrap_or_default();
        let features = self.features.unwrap_or_default();

        let media_probe = match self.media_probe {
            Some(probe) => Some(probe),
            None if features.enable_probe => Some(provide_default_media_probe(&probe)?),
            None => None,
        };

        let library_notifier = match (self.library_notifier, &self.notifier) {
            (Some(notifier), _) => Some(notifier),
            (None, Some(config)) => Some(provide_default_library_notifier(config)?),
            (None, None) => None,
        };

        let config = CoreConfig {
            state_dir,
            libraries: self.libraries,
            probe,
            scheduler: self.scheduler.unwrap_or_default(),
            watcher: self.watcher.unwrap_or_default(),
            notifier: self.notifier,
            features,
            media_probe,
            library_notifier,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;
        Ok(config)
    }
}
