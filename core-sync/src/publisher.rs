//! # Atomic Link Publisher
//!
//! Publishes a destination symlink so that a concurrent reader of the mirror
//! sees either nothing or the finished link:
//!
//! 1. create missing parent directories
//! 2. return early if anything already sits at the destination
//! 3. create the link under a unique hidden sibling name
//! 4. rename the sibling onto the destination
//!
//! Any failure after step 3 removes the sibling. Publishing never replaces an
//! existing entry.

use crate::{Result, SyncError};
use core_async::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// What a publish call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Linked,
    AlreadyPresent,
}

/// Hidden sibling used as the staging name for `dest`.
pub fn staging_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

/// Links `dest` to `target`.
pub async fn publish(target: &Path, dest: &Path) -> Result<PublishOutcome> {
    let publish_error = |source| SyncError::Publish {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await.map_err(publish_error)?;
    }

    if fs::entry_exists(dest).await.map_err(publish_error)? {
        return Ok(PublishOutcome::AlreadyPresent);
    }

    let staging = staging_path(dest);
    fs::symlink(target, &staging).await.map_err(publish_error)?;

    if let Err(e) = commit(&staging, dest).await {
        discard(&staging).await;
        return Err(publish_error(e));
    }

    Ok(PublishOutcome::Linked)
}

/// Moves a staged link onto its destination unless something got there first.
async fn commit(staging: &Path, dest: &Path) -> std::io::Result<()> {
    if fs::entry_exists(dest).await? {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "destination appeared while staging",
        ));
    }
    fs::rename(staging, dest).await
}

async fn discard(staging: &Path) {
    if let Err(e) = fs::remove_file(staging).await {
        debug!("Could not remove staging link {}: {}", staging.display(), e);
    }
}
