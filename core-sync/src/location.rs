//! Typed position of a media entry inside a source tree.
//!
//! Show and season (or movie) names are derived from path structure. Parsing
//! relative to the source root, and checking depth, keeps a stray file at the
//! wrong level from being published under a nonsense title.

use crate::source::LibraryKind;
use crate::{Result, SyncError};
use std::path::{Component, Path, PathBuf};

/// Where an entry sits in the `<root>/...` layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaLocation {
    Movie { name: String, file: String },
    Episode { show: String, season: String, file: String },
}

impl MediaLocation {
    /// Parses `path` (absolute, under `root`) for a library of `kind`.
    pub fn parse(kind: LibraryKind, root: &Path, path: &Path) -> Result<Self> {
        let relative = path
            .strip_prefix(root)
            .map_err(|_| layout_error(path, "not under the source root"))?;

        let mut parts = Vec::with_capacity(kind.depth());
        for component in relative.components() {
            match component {
                Component::Normal(part) => match part.to_str() {
                    Some(part) => parts.push(part.to_string()),
                    None => return Err(layout_error(path, "name is not valid UTF-8")),
                },
                _ => return Err(layout_error(path, "unexpected path component")),
            }
        }

        if parts.len() != kind.depth() {
            return Err(layout_error(
                path,
                &format!(
                    "expected {} levels below the root, found {}",
                    kind.depth(),
                    parts.len()
                ),
            ));
        }

        let mut parts = parts.into_iter();
        let mut next = || parts.next().unwrap_or_default();
        Ok(match kind {
            LibraryKind::Movies => MediaLocation::Movie {
                name: next(),
                file: next(),
            },
            LibraryKind::Tv => MediaLocation::Episode {
                show: next(),
                season: next(),
                file: next(),
            },
        })
    }

    /// Movie or show directory name.
    pub fn title(&self) -> &str {
        match self {
            MediaLocation::Movie { name, .. } => name,
            MediaLocation::Episode { show, .. } => show,
        }
    }

    pub fn file(&self) -> &str {
        match self {
            MediaLocation::Movie { file, .. } | MediaLocation::Episode { file, .. } => file,
        }
    }

    /// Same location with a different filename.
    pub fn with_file(&self, file: impl Into<String>) -> Self {
        let file = file.into();
        match self {
            MediaLocation::Movie { name, .. } => MediaLocation::Movie {
                name: name.clone(),
                file,
            },
            MediaLocation::Episode { show, season, .. } => MediaLocation::Episode {
                show: show.clone(),
                season: season.clone(),
                file,
            },
        }
    }

    /// Mirror position under a destination root.
    pub fn destination(&self, dest_root: &Path) -> PathBuf {
        match self {
            MediaLocation::Movie { name, file } => dest_root.join(name).join(file),
            MediaLocation::Episode { show, season, file } => {
                dest_root.join(show).join(season).join(file)
            }
        }
    }
}

fn layout_error(path: &Path, reason: &str) -> SyncError {
    SyncError::UnexpectedLayout {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
