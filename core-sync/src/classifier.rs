//! # Resolution Classifier
//!
//! Maps a resolved media file to a [`Resolution`] through an ordered chain of
//! tiers; the first tier with an answer wins.
//!
//! ```text
//! 1. FilenameTokens   "2160" / "4k" / "uhd" → 2160p, "1080" → 1080p
//! 2. QualityKeywords  dv / dovi / hdr → 2160p, avc → 1080p
//! 3. ParentFolder     same substring test on the parent directory name
//! 4. Probe            width ≥ 3800 → 2160p, ≥ 1900 → 1080p, else 720p
//! 5. Default          the source's configured resolution
//! ```
//!
//! Tiers 1-3 are pure string functions over the path. The probe tier is the
//! only one with a side effect (a bounded subprocess) and any failure there is
//! treated as "no answer".

use crate::source::Resolution;
use crate::{Result, SyncError};
use bridge_traits::MediaProbe;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Minimum probed width classified as 2160p.
pub const UHD_MIN_WIDTH: u32 = 3800;
/// Minimum probed width classified as 1080p.
pub const FHD_MIN_WIDTH: u32 = 1900;

/// Which tier produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationTier {
    FilenameTokens,
    QualityKeywords,
    ParentFolder,
    Probe,
    Default,
}

impl ClassificationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationTier::FilenameTokens => "filename",
            ClassificationTier::QualityKeywords => "keywords",
            ClassificationTier::ParentFolder => "parent folder",
            ClassificationTier::Probe => "probe",
            ClassificationTier::Default => "default",
        }
    }
}

impl fmt::Display for ClassificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub resolution: Resolution,
    pub tier: ClassificationTier,
}

/// One pure classification tier.
pub trait ResolutionStrategy: Send + Sync {
    fn tier(&self) -> ClassificationTier;

    fn classify(&self, path: &Path) -> Option<Resolution>;
}

/// Substring test shared by the filename and parent-folder tiers.
fn resolution_in_name(name: &str) -> Option<Resolution> {
    if name.contains("2160") || name.contains("4k") || name.contains("uhd") {
        Some(Resolution::Uhd2160)
    } else if name.contains("1080") {
        Some(Resolution::Hd1080)
    } else {
        None
    }
}

/// Maps a probed pixel width to a resolution.
pub fn resolution_for_width(width: u32) -> Resolution {
    if width >= UHD_MIN_WIDTH {
        Resolution::Uhd2160
    } else if width >= FHD_MIN_WIDTH {
        Resolution::Hd1080
    } else {
        Resolution::Hd720
    }
}

fn file_name_lower(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_lowercase())
}

// ============================================================================
// Tiers
// ============================================================================

/// Resolution tokens anywhere in the filename.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameTokens;

impl ResolutionStrategy for FilenameTokens {
    fn tier(&self) -> ClassificationTier {
        ClassificationTier::FilenameTokens
    }

    fn classify(&self, path: &Path) -> Option<Resolution> {
        resolution_in_name(&file_name_lower(path)?)
    }
}

/// Grading and codec tags that correlate with a master's resolution.
///
/// Matched as whole tokens, so `dv` does not fire on `dvd` or `advance`.
#[derive(Debug, Default, Clone, Copy)]
pub struct QualityKeywords;

impl ResolutionStrategy for QualityKeywords {
    fn tier(&self) -> ClassificationTier {
        ClassificationTier::QualityKeywords
    }

    fn classify(&self, path: &Path) -> Option<Resolution> {
        let name = file_name_lower(path)?;
        let tokens: Vec<&str> = name
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let has = |wanted: &[&str]| tokens.iter().any(|t| wanted.contains(t));
        if has(&["dv", "dovi", "hdr", "hdr10"]) {
            Some(Resolution::Uhd2160)
        } else if has(&["avc"]) {
            Some(Resolution::Hd1080)
        } else {
            None
        }
    }
}

/// Resolution tokens in the immediate parent directory name.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParentFolder;

impl ResolutionStrategy for ParentFolder {
    fn tier(&self) -> ClassificationTier {
        ClassificationTier::ParentFolder
    }

    fn classify(&self, path: &Path) -> Option<Resolution> {
        resolution_in_name(&path.parent().and_then(file_name_lower)?)
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Ordered classifier chain with an optional probe tier.
#[derive(Clone)]
pub struct Classifier {
    strategies: Vec<Arc<dyn ResolutionStrategy>>,
    probe: Option<Arc<dyn MediaProbe>>,
}

impl Classifier {
    /// Standard chain: filename, keywords, parent folder, then the probe.
    pub fn new(probe: Option<Arc<dyn MediaProbe>>) -> Self {
        Self {
            strategies: vec![
                Arc::new(FilenameTokens),
                Arc::new(QualityKeywords),
                Arc::new(ParentFolder),
            ],
            probe,
        }
    }

    /// Chain built from explicit strategies.
    pub fn with_strategies(
        strategies: Vec<Arc<dyn ResolutionStrategy>>,
        probe: Option<Arc<dyn MediaProbe>>,
    ) -> Self {
        Self { strategies, probe }
    }

    pub fn has_probe(&self) -> bool {
        self.probe.is_some()
    }

    /// Classifies `target`, falling back to `default` when no tier answers.
    pub async fn classify(&self, target: &Path, default: Resolution) -> Classification {
        for strategy in &self.strategies {
            if let Some(resolution) = strategy.classify(target) {
                return Classification {
                    resolution,
                    tier: strategy.tier(),
                };
            }
        }

        match self.probe_resolution(target).await {
            Ok(Some(resolution)) => {
                return Classification {
                    resolution,
                    tier: ClassificationTier::Probe,
                };
            }
            Ok(None) => {}
            Err(e) => debug!("{}", e),
        }

        Classification {
            resolution: default,
            tier: ClassificationTier::Default,
        }
    }

    /// Probe tier on its own. `Ok(None)` when no probe is configured.
    pub async fn probe_resolution(&self, target: &Path) -> Result<Option<Resolution>> {
        let Some(probe) = &self.probe else {
            return Ok(None);
        };

        match probe.video_width(target).await {
            Ok(width) if width > 0 => Ok(Some(resolution_for_width(width))),
            Ok(_) => Err(SyncError::Probe {
                path: target.to_path_buf(),
                reason: "no video width reported".to_string(),
            }),
            Err(e) => Err(SyncError::Probe {
                path: target.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tiers: Vec<_> = self.strategies.iter().map(|s| s.tier()).collect();
        f.debug_struct("Classifier")
            .field("tiers", &tiers)
            .field("probe", &self.probe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use mockall::mock;
    use std::time::Duration;

    mock! {
        Probe {}

        #[async_trait]
        impl MediaProbe for Probe {
            async fn video_width(&self, path: &Path) -> BridgeResult<u32>;
        }
    }

    #[test]
    fn test_filename_tokens() {
        let tier = FilenameTokens;
        assert_eq!(tier.classify(Path::new("/a/Movie.2160p.mkv")), Some(Resolution::Uhd2160));
        assert_eq!(tier.classify(Path::new("/a/Movie.4K.mkv")), Some(Resolution::Uhd2160));
        assert_eq!(tier.classify(Path::new("/a/Movie.UHD.mkv")), Some(Resolution::Uhd2160));
        assert_eq!(tier.classify(Path::new("/a/Movie.1080p.mkv")), Some(Resolution::Hd1080));
        assert_eq!(tier.classify(Path::new("/a/Movie.mkv")), None);
    }

    #[test]
    fn test_quality_keywords_are_whole_tokens() {
        let tier = QualityKeywords;
        assert_eq!(tier.classify(Path::new("/a/Movie.DV.mkv")), Some(Resolution::Uhd2160));
        assert_eq!(tier.classify(Path::new("/a/Movie HDR x265.mkv")), Some(Resolution::Uhd2160));
        assert_eq!(tier.classify(Path::new("/a/Movie.AVC.mkv")), Some(Resolution::Hd1080));
        assert_eq!(tier.classify(Path::new("/a/Movie.DVDRip.mkv")), None);
        assert_eq!(tier.classify(Path::new("/a/Advance.mkv")), None);
    }

    #[test]
    fn test_parent_folder() {
        let tier = ParentFolder;
        assert_eq!(
            tier.classify(Path::new("/a/Movie (2020) [1080p]/movie.mkv")),
            Some(Resolution::Hd1080)
        );
        assert_eq!(tier.classify(Path::new("/a/Movie 4K/movie.mkv")), Some(Resolution::Uhd2160));
        assert_eq!(
            tier.classify(Path::new("/a/Movie UHD Remux/movie.mkv")),
            Some(Resolution::Uhd2160)
        );
        assert_eq!(tier.classify(Path::new("/a/Movie/movie.mkv")), None);
    }

    #[test]
    fn test_width_thresholds() {
        assert_eq!(resolution_for_width(3840), Resolution::Uhd2160);
        assert_eq!(resolution_for_width(3800), Resolution::Uhd2160);
        assert_eq!(resolution_for_width(1920), Resolution::Hd1080);
        assert_eq!(resolution_for_width(1900), Resolution::Hd1080);
        assert_eq!(resolution_for_width(1280), Resolution::Hd720);
    }

    #[tokio::test]
    async fn test_filename_beats_folder_and_probe() {
        let mut probe = MockProbe::new();
        probe.expect_video_width().never();
        let classifier = Classifier::new(Some(Arc::new(probe)));

        let result = classifier
            .classify(Path::new("/a/Movie 1080/Movie.2160p.mkv"), Resolution::Hd720)
            .await;
        assert_eq!(result.resolution, Resolution::Uhd2160);
        assert_eq!(result.tier, ClassificationTier::FilenameTokens);
    }

    #[tokio::test]
    async fn test_probe_used_when_names_are_silent() {
        let mut probe = MockProbe::new();
        probe.expect_video_width().times(1).returning(|_| Ok(1920));
        let classifier = Classifier::new(Some(Arc::new(probe)));

        let result = classifier
            .classify(Path::new("/a/Movie/movie.mkv"), Resolution::Uhd2160)
            .await;
        assert_eq!(result.resolution, Resolution::Hd1080);
        assert_eq!(result.tier, ClassificationTier::Probe);
    }

    #[tokio::test]
    async fn test_probe_failure_falls_back_to_default() {
        let mut probe = MockProbe::new();
        probe
            .expect_video_width()
            .times(1)
            .returning(|_| Err(BridgeError::Timeout(Duration::from_secs(5))));
        let classifier = Classifier::new(Some(Arc::new(probe)));

        let result = classifier
            .classify(Path::new("/a/Movie/movie.mkv"), Resolution::Hd1080)
            .await;
        assert_eq!(result.resolution, Resolution::Hd1080);
        assert_eq!(result.tier, ClassificationTier::Default);
    }

    #[tokio::test]
    async fn test_probe_errors_are_typed() {
        let mut probe = MockProbe::new();
        probe
            .expect_video_width()
            .times(2)
            .returning(|path| {
                if path.ends_with("zero.mkv") {
                    Ok(0)
                } else {
                    Err(BridgeError::NotAvailable("ffprobe".to_string()))
                }
            });
        let classifier = Classifier::new(Some(Arc::new(probe)));

        let missing = classifier.probe_resolution(Path::new("/a/movie.mkv")).await;
        assert!(matches!(missing, Err(SyncError::Probe { reason, .. }) if reason.contains("ffprobe")));

        let zero = classifier.probe_resolution(Path::new("/a/zero.mkv")).await;
        assert!(matches!(zero, Err(ref e @ SyncError::Probe { .. }) if e.is_entry_level()));

        let none = Classifier::default().probe_resolution(Path::new("/a/movie.mkv")).await;
        assert!(matches!(none, Ok(None)));
    }

    #[tokio::test]
    async fn test_no_probe_uses_default() {
        let classifier = Classifier::default();
        let result = classifier
            .classify(Path::new("/a/Movie/movie.mkv"), Resolution::Uhd2160)
            .await;
        assert_eq!(result.resolution, Resolution::Uhd2160);
        assert_eq!(result.tier, ClassificationTier::Default);
    }
}
