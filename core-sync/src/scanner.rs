//! Symlink discovery and tree fingerprints.
//!
//! Both walks are synchronous `walkdir` traversals moved onto the blocking
//! pool. Links are never followed during the walk; a symlink is recognised by
//! its own metadata.

use crate::Result;
use core_async::task::spawn_blocking;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use walkdir::WalkDir;

/// A symbolic link found under a source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkEntry {
    pub link_path: PathBuf,
    /// Modification time of the link itself, in nanoseconds since the epoch
    pub mod_time_nanos: i128,
}

impl SymlinkEntry {
    pub fn file_name(&self) -> Option<&str> {
        self.link_path.file_name().and_then(|n| n.to_str())
    }
}

/// Lists every symlink under `root`, newest first.
///
/// A missing root yields an empty list. Links that resolve to directories are
/// left out, dangling links are kept (the caller reports them). Ties in
/// modification time are ordered by path.
pub async fn scan_symlinks(root: &Path) -> Result<Vec<SymlinkEntry>> {
    let root = root.to_path_buf();
    let entries = spawn_blocking(move || scan_blocking(&root)).await?;
    Ok(entries)
}

fn scan_blocking(root: &Path) -> Vec<SymlinkEntry> {
    if fs::symlink_metadata(root).is_err() {
        debug!(root = %root.display(), "Source root missing, nothing to scan");
        return Vec::new();
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(root).min_depth(1).follow_links(false) {
        let item = match item {
            Ok(item) => item,
            Err(err) => {
                debug!(error = %err, "Skipping unreadable entry");
                continue;
            }
        };

        if !item.path_is_symlink() {
            continue;
        }

        let metadata = match item.path().symlink_metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!(path = %item.path().display(), error = %err, "Skipping link without metadata");
                continue;
            }
        };

        if fs::metadata(item.path()).map(|m| m.is_dir()).unwrap_or(false) {
            continue;
        }

        entries.push(SymlinkEntry {
            link_path: item.into_path(),
            mod_time_nanos: metadata.modified().map(epoch_nanos).unwrap_or(0),
        });
    }

    entries.sort_by(|a, b| {
        b.mod_time_nanos
            .cmp(&a.mod_time_nanos)
            .then_with(|| a.link_path.cmp(&b.link_path))
    });
    entries
}

/// Hash over the sorted `(relative path, mtime)` pairs of every entry below
/// `root`. Returns `None` when the root does not exist.
pub async fn fingerprint(root: &Path) -> Result<Option<String>> {
    let root = root.to_path_buf();
    let digest = spawn_blocking(move || fingerprint_blocking(&root)).await?;
    Ok(digest)
}

fn fingerprint_blocking(root: &Path) -> Option<String> {
    if fs::symlink_metadata(root).is_err() {
        return None;
    }

    let mut items: Vec<(String, i128)> = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter_map(|item| {
            let relative = item.path().strip_prefix(root).ok()?.to_string_lossy().into_owned();
            let mtime = item
                .path()
                .symlink_metadata()
                .and_then(|m| m.modified())
                .map(epoch_nanos)
                .unwrap_or(0);
            Some((relative, mtime))
        })
        .collect();
    items.sort();

    let mut hasher = Sha256::new();
    for (name, mtime) in &items {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(mtime.to_le_bytes());
    }
    Some(hex::encode(hasher.finalize()))
}

fn epoch_nanos(time: SystemTime) -> i128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos() as i128,
        Err(before) => -(before.duration().as_nanos() as i128),
    }
}
