//! Per-source incremental cursor persisted as a decimal epoch-seconds value.

use crate::{Result, SyncError};
use chrono::{DateTime, Local};
use core_async::fs;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// File-backed watermark for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cursor. Missing, empty or corrupt content reads as `0`.
    pub async fn load(&self) -> Result<i64> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(SyncError::WatermarkIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }

        match trimmed.parse::<i64>() {
            Ok(ts) if ts >= 0 => Ok(ts),
            _ => {
                warn!(
                    "Watermark file {} holds '{}', treating as 0",
                    self.path.display(),
                    trimmed
                );
                Ok(0)
            }
        }
    }

    /// Persists `ts` via a sibling temp file and a rename.
    pub async fn store(&self, ts: i64) -> Result<()> {
        let io_error = |source| SyncError::WatermarkIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = self
            .path
            .with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()));

        fs::write(&temp, format!("{}\n", ts)).await.map_err(io_error)?;
        if let Err(e) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(io_error(e));
        }
        Ok(())
    }
}

/// True when an entry modified at `mod_time_nanos` is not newer than the
/// watermark, i.e. the incremental scan can stop.
pub fn is_at_or_before(mod_time_nanos: i128, watermark_secs: i64) -> bool {
    mod_time_nanos <= i128::from(watermark_secs) * NANOS_PER_SEC
}

/// Local wall-clock rendering used in progress output.
pub fn human_time(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// What happened to the watermark at the end of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkReport {
    Advanced { ts: i64, human: String },
    /// Pure incremental pass without mutations
    Unchanged,
    /// Full or filtered pass
    Skipped,
    Failed { message: String },
}

impl fmt::Display for WatermarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatermarkReport::Advanced { ts, human } => {
                write!(f, "Updated timestamp: {} ({})", human, ts)
            }
            WatermarkReport::Unchanged => {
                f.write_str("No changes detected; timestamp not updated.")
            }
            WatermarkReport::Skipped => {
                f.write_str("Skipped timestamp update (targeted or full refresh).")
            }
            WatermarkReport::Failed { message } => {
                write!(f, "Failed to update timestamp file: {}", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_zero() {
        let dir = TempDir::new().unwrap();
        let store = WatermarkStore::new(dir.path().join("tv-4k.last"));
        assert_eq!(store.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_or_empty_reads_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movies-4k.last");
        let store = WatermarkStore::new(&path);

        std::fs::write(&path, "").unwrap();
        assert_eq!(store.load().await.unwrap(), 0);

        std::fs::write(&path, "not-a-number").unwrap();
        assert_eq!(store.load().await.unwrap(), 0);

        std::fs::write(&path, "-5").unwrap();
        assert_eq!(store.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let dir = TempDir::new().unwrap();
        let store = WatermarkStore::new(dir.path().join("cache/nested/tv-1080.last"));

        store.store(1_700_000_000).await.unwrap();
        assert_eq!(store.load().await.unwrap(), 1_700_000_000);

        let leftovers = std::fs::read_dir(dir.path().join("cache/nested"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_unreadable_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be
        let path = dir.path().join("blocked.last");
        std::fs::create_dir(&path).unwrap();
        let store = WatermarkStore::new(&path);

        assert!(matches!(store.load().await, Err(SyncError::WatermarkIo { .. })));
        assert!(matches!(store.store(10).await, Err(SyncError::WatermarkIo { .. })));
    }

    #[test]
    fn test_cutoff_comparison() {
        assert!(is_at_or_before(30 * 1_000_000_000, 30));
        assert!(is_at_or_before(20 * 1_000_000_000, 30));
        assert!(!is_at_or_before(30 * 1_000_000_000 + 1, 30));
        assert!(!is_at_or_before(1, 0));
    }

    #[test]
    fn test_report_wording() {
        assert_eq!(
            WatermarkReport::Unchanged.to_string(),
            "No changes detected; timestamp not updated."
        );
        assert!(WatermarkReport::Advanced {
            ts: 42,
            human: "x".to_string()
        }
        .to_string()
        .ends_with("(42)"));
    }
}
