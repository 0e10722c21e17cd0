//! Read-only listing of a destination tree for presentation layers.

use crate::job::validate_title_filter;
use crate::Result;
use core_async::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Extensions listed as media files, compared case-insensitively.
pub const MEDIA_EXTENSIONS: [&str; 2] = ["mkv", "mp4"];

pub fn is_media_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| MEDIA_EXTENSIONS.iter().any(|m| e.eq_ignore_ascii_case(m)))
        .unwrap_or(false)
}

/// Lists one library's destination root.
#[derive(Debug, Clone)]
pub struct DestinationBrowser {
    root: PathBuf,
}

impl DestinationBrowser {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Show or movie directories.
    pub async fn list_titles(&self) -> Result<Vec<String>> {
        list_dirs(&self.root).await
    }

    pub async fn list_seasons(&self, show: &str) -> Result<Vec<String>> {
        validate_title_filter(show)?;
        list_dirs(&self.root.join(show)).await
    }

    pub async fn list_episodes(&self, show: &str, season: &str) -> Result<Vec<String>> {
        validate_title_filter(show)?;
        validate_title_filter(season)?;
        list_media(&self.root.join(show).join(season)).await
    }

    pub async fn list_movie_files(&self, movie: &str) -> Result<Vec<String>> {
        validate_title_filter(movie)?;
        list_media(&self.root.join(movie)).await
    }
}

async fn list_dirs(path: &Path) -> Result<Vec<String>> {
    list_entries(path, |_, is_dir| is_dir).await
}

async fn list_media(path: &Path) -> Result<Vec<String>> {
    list_entries(path, |name, is_dir| !is_dir && is_media_file(name)).await
}

async fn list_entries<F>(path: &Path, keep: F) -> Result<Vec<String>>
where
    F: Fn(&str, bool) -> bool,
{
    let mut dir = match fs::read_dir(path).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = dir.next_entry().await? {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        // Follows links, so a linked directory lists as a directory
        let is_dir = fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if keep(&name, is_dir) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
