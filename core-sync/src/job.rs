//! # Sync Run Descriptors
//!
//! A [`SyncRun`] describes one requested pass: its mode, optional scope
//! filters, and whether the scoped destination subtree is wiped first.
//!
//! ## Watermark policy
//!
//! ```text
//! Incremental, no filters  → read watermark, early-stop, advance on mutation
//! Full, or any filter      → watermark treated as 0, never written
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_sync::{SyncMode, SyncRun};
//!
//! let nightly = SyncRun::incremental();
//! assert!(nightly.is_pure_incremental());
//!
//! let refresh = SyncRun::show("Foo").unwrap().with_wipe(true);
//! assert!(!refresh.is_pure_incremental());
//! assert_eq!(refresh.mode, SyncMode::Full);
//! ```

use crate::source::LibraryKind;
use crate::{Result, SyncError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

static EPISODE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)s\d{2}e\d{2}").expect("episode token regex should compile"));

static EPISODE_FILTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^s\d{2}e\d{2}$").expect("episode filter regex should compile"));

// ============================================================================
// Mode
// ============================================================================

/// Whether a pass honours the persisted watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Walk everything; never touch the watermark
    Full,
    /// Only entries newer than the watermark
    #[default]
    Incremental,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Full => "full",
            SyncMode::Incremental => "incremental",
        }
    }
}

impl FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "full" => Ok(SyncMode::Full),
            "incremental" => Ok(SyncMode::Incremental),
            _ => Err(SyncError::InvalidSyncMode(s.to_string())),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Episode code
// ============================================================================

/// Normalised `SxxEyy` episode code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeCode(String);

impl EpisodeCode {
    /// Parses a filter value such as `s01e03`.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        if !EPISODE_FILTER.is_match(code) {
            return Err(SyncError::InvalidFilter(format!(
                "episode filter '{}' must look like S01E03",
                code
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// First `SxxEyy` token in a filename, case-insensitive.
    pub fn find_in(file_name: &str) -> Option<Self> {
        EPISODE_TOKEN
            .find(file_name)
            .map(|m| Self(m.as_str().to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpisodeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checks that a title filter names exactly one directory below a root.
///
/// Titles are joined onto the destination root before a wipe, so anything
/// that could walk outside it is refused.
pub fn validate_title_filter(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(SyncError::InvalidFilter(
            "title filter cannot be empty".to_string(),
        ));
    }

    if title.contains('/') || title.contains('\\') {
        return Err(SyncError::InvalidFilter(format!(
            "title filter '{}' must not contain path separators",
            title
        )));
    }

    let mut components = Path::new(title).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(SyncError::InvalidFilter(format!(
            "title filter '{}' must be a single directory name",
            title
        ))),
    }
}

// ============================================================================
// Run descriptor
// ============================================================================

/// One requested pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncRun {
    pub mode: SyncMode,
    /// Movie directory name under the source root
    pub movie_filter: Option<String>,
    /// Show directory name under the source root
    pub show_filter: Option<String>,
    /// Episode restriction within the show filter
    pub episode_filter: Option<EpisodeCode>,
    /// Remove the scoped destination subtree before scanning
    pub wipe_dest: bool,
}

impl SyncRun {
    pub fn incremental() -> Self {
        Self::default()
    }

    pub fn full() -> Self {
        Self {
            mode: SyncMode::Full,
            ..Self::default()
        }
    }

    pub fn with_mode(mode: SyncMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Targeted refresh of one movie.
    pub fn movie(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_title_filter(&name)?;
        Ok(Self {
            mode: SyncMode::Full,
            movie_filter: Some(name),
            ..Self::default()
        })
    }

    /// Targeted refresh of one show.
    pub fn show(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_title_filter(&name)?;
        Ok(Self {
            mode: SyncMode::Full,
            show_filter: Some(name),
            ..Self::default()
        })
    }

    /// Targeted refresh of one episode of a show.
    pub fn episode(show: impl Into<String>, code: &str) -> Result<Self> {
        let mut run = Self::show(show)?;
        run.episode_filter = Some(EpisodeCode::parse(code)?);
        Ok(run)
    }

    pub fn with_wipe(mut self, wipe: bool) -> Self {
        self.wipe_dest = wipe;
        self
    }

    pub fn has_filters(&self) -> bool {
        self.movie_filter.is_some() || self.show_filter.is_some() || self.episode_filter.is_some()
    }

    /// Incremental with no filters: the only shape that reads and advances
    /// the watermark.
    pub fn is_pure_incremental(&self) -> bool {
        self.mode == SyncMode::Incremental && !self.has_filters()
    }

    /// Title filter that applies to a library of `kind`.
    pub fn title_filter(&self, kind: LibraryKind) -> Option<&str> {
        match kind {
            LibraryKind::Movies => self.movie_filter.as_deref(),
            LibraryKind::Tv => self.show_filter.as_deref(),
        }
    }

    /// Destination subtree to wipe for a library of `kind`, if any.
    ///
    /// A wipe without a matching title filter is never applied.
    pub fn wipe_target(&self, kind: LibraryKind) -> Option<&str> {
        if self.wipe_dest {
            self.title_filter(kind)
        } else {
            None
        }
    }

    /// Same run with the wipe dropped, for every source after the first.
    pub fn without_wipe(&self) -> Self {
        Self {
            wipe_dest: false,
            ..self.clone()
        }
    }

    /// Re-checks filters on runs assembled field by field.
    pub fn validate(&self) -> Result<()> {
        if let Some(movie) = &self.movie_filter {
            validate_title_filter(movie)?;
        }
        if let Some(show) = &self.show_filter {
            validate_title_filter(show)?;
        }
        if self.episode_filter.is_some() && self.show_filter.is_none() {
            return Err(SyncError::InvalidFilter(
                "episode filter requires a show filter".to_string(),
            ));
        }
        if self.wipe_dest && self.movie_filter.is_none() && self.show_filter.is_none() {
            return Err(SyncError::InvalidFilter(
                "wipe requires a movie or show filter".to_string(),
            ));
        }
        // The wipe clears the whole show while only one episode is relinked
        if self.wipe_dest && self.episode_filter.is_some() {
            return Err(SyncError::InvalidFilter(
                "wipe cannot be combined with an episode filter".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_mode_round_trip() {
        assert_eq!("FULL".parse::<SyncMode>().unwrap(), SyncMode::Full);
        assert_eq!(SyncMode::Incremental.to_string(), "incremental");
        assert!(matches!(
            "partial".parse::<SyncMode>(),
            Err(SyncError::InvalidSyncMode(_))
        ));
    }

    #[test]
    fn test_episode_code_parse_normalises() {
        assert_eq!(EpisodeCode::parse("s01e03").unwrap().as_str(), "S01E03");
        assert!(EpisodeCode::parse("S1E3").is_err());
        assert!(EpisodeCode::parse("S01E03x").is_err());
    }

    #[test]
    fn test_episode_code_find_in_filename() {
        let code = EpisodeCode::find_in("Foo.s02E10.1080p.mkv").unwrap();
        assert_eq!(code.as_str(), "S02E10");
        assert!(EpisodeCode::find_in("Foo Special.mkv").is_none());
    }

    #[test]
    fn test_title_filter_validation() {
        assert!(validate_title_filter("The Show (2020)").is_ok());
        assert!(validate_title_filter("").is_err());
        assert!(validate_title_filter("..").is_err());
        assert!(validate_title_filter(".").is_err());
        assert!(validate_title_filter("a/b").is_err());
        assert!(validate_title_filter("/abs").is_err());
    }

    #[test]
    fn test_pure_incremental() {
        assert!(SyncRun::incremental().is_pure_incremental());
        assert!(!SyncRun::full().is_pure_incremental());

        let mut filtered = SyncRun::incremental();
        filtered.movie_filter = Some("Heat".to_string());
        assert!(!filtered.is_pure_incremental());
    }

    #[test]
    fn test_wipe_target_scoped_by_kind() {
        let run = SyncRun::show("Foo").unwrap().with_wipe(true);
        assert_eq!(run.wipe_target(LibraryKind::Tv), Some("Foo"));
        assert_eq!(run.wipe_target(LibraryKind::Movies), None);
        assert_eq!(run.without_wipe().wipe_target(LibraryKind::Tv), None);

        let no_wipe = SyncRun::show("Foo").unwrap();
        assert_eq!(no_wipe.wipe_target(LibraryKind::Tv), None);
    }

    #[test]
    fn test_validate_rejects_unscoped_wipe() {
        let run = SyncRun::full().with_wipe(true);
        assert!(matches!(run.validate(), Err(SyncError::InvalidFilter(_))));

        let run = SyncRun {
            episode_filter: Some(EpisodeCode::parse("S01E01").unwrap()),
            ..SyncRun::full()
        };
        assert!(run.validate().is_err());

        assert!(SyncRun::episode("Foo", "s01e01").unwrap().validate().is_ok());

        let run = SyncRun::episode("Foo", "s01e01").unwrap().with_wipe(true);
        assert!(matches!(run.validate(), Err(SyncError::InvalidFilter(_))));
    }
}
