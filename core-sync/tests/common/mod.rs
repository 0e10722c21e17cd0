//! Shared filesystem fixtures for the pass tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{FixedClock, MediaProbe};
use core_sync::{Classifier, LibraryKind, MediaSource, Orchestrator, Resolution};
use filetime::{set_symlink_file_times, FileTime};
use mockall::mock;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

mock! {
    pub Probe {}

    #[async_trait]
    impl MediaProbe for Probe {
        async fn video_width(&self, path: &Path) -> BridgeResult<u32>;
    }
}

/// Source mount, backing store, destination and state directory in one
/// temporary tree.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn dest(&self) -> PathBuf {
        self.path("media")
    }

    pub fn state(&self) -> PathBuf {
        self.path("state")
    }

    /// Creates `store/<target_rel>` and a link to it at `<source>/<link_rel>`
    /// with the given modification time.
    pub fn add_link(&self, source: &str, link_rel: &str, target_rel: &str, mtime: i64) -> PathBuf {
        let target = self.path("store").join(target_rel);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"media").unwrap();
        self.add_raw_link(source, link_rel, &target, mtime)
    }

    /// Link to an arbitrary, possibly missing, target.
    pub fn add_raw_link(&self, source: &str, link_rel: &str, target: &Path, mtime: i64) -> PathBuf {
        let link = self.path(source).join(link_rel);
        fs::create_dir_all(link.parent().unwrap()).unwrap();
        symlink(target, &link).unwrap();
        let t = FileTime::from_unix_time(mtime, 0);
        set_symlink_file_times(&link, t, t).unwrap();
        link
    }

    pub fn source(&self, name: &str, default_resolution: Resolution) -> MediaSource {
        MediaSource::new(
            name,
            self.path(name),
            self.state().join(format!("{}.last", name)),
            default_resolution,
        )
    }

    pub fn orchestrator(&self, kind: LibraryKind, probe: Option<Arc<dyn MediaProbe>>, now: i64) -> Orchestrator {
        Orchestrator::new(kind, self.dest(), Classifier::new(probe))
            .with_clock(Arc::new(FixedClock::from_unix(now)))
    }

    pub fn exists(&self, rel: &str) -> bool {
        fs::symlink_metadata(self.path(rel)).is_ok()
    }

    /// Every path under `rel` whose name ends with `.tmp`.
    pub fn leftover_temps(&self, rel: &str) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut stack = vec![self.path(rel)];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else { continue };
            for entry in entries.flatten() {
                let path = entry.path();
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    stack.push(path);
                } else if path.to_string_lossy().ends_with(".tmp") {
                    found.push(path);
                }
            }
        }
        found
    }
}
