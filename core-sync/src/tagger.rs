//! Embeds a resolution label into a source link's filename, once.

use crate::source::Resolution;
use crate::{Result, SyncError};
use core_async::fs;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

static TAGGED_STEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*\S.* - (2160p|1080p|720p)$").expect("tagged stem regex should compile")
});

/// Splits `name` into stem and extension (with its dot).
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Label already carried by `file_name`, if it is tagged.
pub fn existing_tag(file_name: &str) -> Option<Resolution> {
    let (stem, _) = split_extension(file_name);
    TAGGED_STEM
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .and_then(|label| Resolution::from_label(label.as_str()))
}

/// True when `file_name` is `<text> - <label><ext>`.
pub fn is_tagged(file_name: &str) -> bool {
    existing_tag(file_name).is_some()
}

/// `Foo.mkv` → `Foo - 1080p.mkv`
pub fn tagged_name(file_name: &str, resolution: Resolution) -> String {
    let (stem, ext) = split_extension(file_name);
    format!("{} - {}{}", stem, resolution.label(), ext)
}

/// Renames the link at `path` to its tagged name and returns the new path.
///
/// A link that disappeared before the rename is a [`SyncError::RenameRace`];
/// an existing sibling with the tagged name is never overwritten.
pub async fn tag_in_place(path: &Path, resolution: Resolution) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SyncError::UnexpectedLayout {
            path: path.to_path_buf(),
            reason: "file name is not valid UTF-8".to_string(),
        })?;

    let new_name = tagged_name(file_name, resolution);
    let new_path = path.with_file_name(&new_name);

    let occupied = fs::entry_exists(&new_path)
        .await
        .map_err(|source| SyncError::Rename {
            path: path.to_path_buf(),
            tagged: new_name.clone(),
            source,
        })?;
    if occupied {
        return Err(SyncError::TagConflict { path: new_path });
    }

    match fs::rename(path, &new_path).await {
        Ok(()) => Ok(new_path),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(SyncError::RenameRace {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(SyncError::Rename {
            path: path.to_path_buf(),
            tagged: new_name,
            source,
        }),
    }
}
