//! Serialises destructive refreshes per `(library, title)`.

use core_sync::{LibraryKind, SyncError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

type RefreshKey = (LibraryKind, String);

#[derive(Debug, Clone, Default)]
pub(crate) struct RefreshRegistry {
    active: Arc<Mutex<HashSet<RefreshKey>>>,
}

impl RefreshRegistry {
    /// Claims `title` in `kind` until the returned guard is dropped.
    pub(crate) fn acquire(&self, kind: LibraryKind, title: &str) -> Result<RefreshGuard, SyncError> {
        let key = (kind, title.to_string());
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if !active.insert(key.clone()) {
            return Err(SyncError::RefreshInProgress {
                library: kind.as_str().to_string(),
                title: title.to_string(),
            });
        }
        Ok(RefreshGuard {
            active: Arc::clone(&self.active),
            key,
        })
    }

    #[cfg(test)]
    fn is_active(&self, kind: LibraryKind, title: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&(kind, title.to_string()))
    }
}

#[derive(Debug)]
pub(crate) struct RefreshGuard {
    active: Arc<Mutex<HashSet<RefreshKey>>>,
    key: RefreshKey,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.key);
    }
}
