//! Async filesystem helpers re-exported from the underlying runtime.
//!
//! The mirror engine works almost exclusively with symbolic links, so the
//! re-export set includes the link-aware calls (`symlink_metadata`,
//! `read_link`, `canonicalize`) alongside the usual directory helpers.

pub use tokio::fs::{
    canonicalize, create_dir_all, metadata, read_dir, read_link, read_to_string, remove_dir_all,
    remove_file, rename, symlink_metadata, try_exists, write, DirEntry,
};

#[cfg(unix)]
pub use tokio::fs::symlink;

/// Returns `true` when `path` names an existing entry without following a
/// trailing symlink.
///
/// Unlike [`try_exists`], a dangling symlink counts as present.
pub async fn entry_exists(path: &std::path::Path) -> std::io::Result<bool> {
    match symlink_metadata(path).await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
