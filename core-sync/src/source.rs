//! Typed media sources and the vocabulary they are described in.

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Resolution label embedded into published filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "2160p")]
    Uhd2160,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::Uhd2160, Resolution::Hd1080, Resolution::Hd720];

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Uhd2160 => "2160p",
            Resolution::Hd1080 => "1080p",
            Resolution::Hd720 => "720p",
        }
    }

    /// Exact match against a tag label as it appears in a filename.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.label() == label)
    }
}

impl FromStr for Resolution {
    type Err = SyncError;

    /// Accepts labels and the short aliases used on the command line.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2160p" | "2160" | "4k" | "uhd" => Ok(Resolution::Uhd2160),
            "1080p" | "1080" => Ok(Resolution::Hd1080),
            "720p" | "720" => Ok(Resolution::Hd720),
            _ => Err(SyncError::InvalidResolution(s.to_string())),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shape of a logical library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    /// `<root>/<movie>/<file>`
    Movies,
    /// `<root>/<show>/<season>/<file>`
    Tv,
}

impl LibraryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryKind::Movies => "movies",
            LibraryKind::Tv => "tv",
        }
    }

    /// Path components from a root down to a media file.
    pub fn depth(&self) -> usize {
        match self {
            LibraryKind::Movies => 2,
            LibraryKind::Tv => 3,
        }
    }

    /// Heading used in progress output.
    pub fn heading(&self) -> &'static str {
        match self {
            LibraryKind::Movies => "MOVIE",
            LibraryKind::Tv => "TV",
        }
    }
}

impl FromStr for LibraryKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movies" | "movie" => Ok(LibraryKind::Movies),
            "tv" | "shows" => Ok(LibraryKind::Tv),
            _ => Err(SyncError::InvalidLibraryKind(s.to_string())),
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical mount contributing to a logical library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub name: String,
    pub root: PathBuf,
    pub watermark_path: PathBuf,
    pub default_resolution: Resolution,
    /// Lower runs first
    pub priority: u32,
}

impl MediaSource {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        watermark_path: impl Into<PathBuf>,
        default_resolution: Resolution,
    ) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            watermark_path: watermark_path.into(),
            default_resolution,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Same source reading from a different root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
