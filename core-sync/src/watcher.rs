//! # Change Watcher
//!
//! Polls a fingerprint of each watched root and runs that root's handler when
//! the fingerprint changes. The first observation of a root counts as a
//! change. Missing roots are skipped for the round.

use crate::scanner::fingerprint;
use crate::Result;
use core_async::sync::CancellationToken;
use core_async::task::spawn;
use core_async::time::{sleep, Duration};
use core_runtime::events::{CoreEvent, EventBus, WatcherEvent};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Work to run when a watched root changes.
pub type ChangeHandler = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

pub struct WatchTarget {
    pub key: String,
    pub root: PathBuf,
    handler: ChangeHandler,
}

impl WatchTarget {
    pub fn new(key: impl Into<String>, root: impl Into<PathBuf>, handler: ChangeHandler) -> Self {
        Self {
            key: key.into(),
            root: root.into(),
            handler,
        }
    }
}

impl fmt::Debug for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchTarget")
            .field("key", &self.key)
            .field("root", &self.root)
            .finish()
    }
}

pub struct ChangeWatcher {
    targets: Vec<WatchTarget>,
    poll_interval: Duration,
    fingerprints: HashMap<String, String>,
    events: Option<EventBus>,
}

impl ChangeWatcher {
    pub fn new(targets: Vec<WatchTarget>, poll_interval: Duration) -> Self {
        Self {
            targets,
            poll_interval,
            fingerprints: HashMap::new(),
            events: None,
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }

    /// Checks every root once and returns the keys whose handlers ran.
    ///
    /// Handler failures, including panics, are logged and do not stop the
    /// round.
    pub async fn poll_once(&mut self) -> Vec<String> {
        let mut triggered = Vec::new();

        for target in &self.targets {
            let current = match fingerprint(&target.root).await {
                Ok(Some(current)) => current,
                Ok(None) => {
                    debug!("Watch root {} missing, skipping", target.root.display());
                    emit(
                        self.events.as_ref(),
                        WatcherEvent::RootMissing {
                            key: target.key.clone(),
                            root: target.root.display().to_string(),
                        },
                    );
                    continue;
                }
                Err(e) => {
                    warn!("Fingerprint of {} failed: {}", target.root.display(), e);
                    continue;
                }
            };

            if self.fingerprints.get(&target.key) == Some(&current) {
                continue;
            }
            self.fingerprints.insert(target.key.clone(), current);

            info!("Change detected in {} ({})", target.key, target.root.display());
            emit(
                self.events.as_ref(),
                WatcherEvent::ChangeDetected {
                    key: target.key.clone(),
                    root: target.root.display().to_string(),
                },
            );

            match spawn((target.handler)()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Sync for {} failed: {}", target.key, e),
                Err(e) => error!("Sync for {} panicked: {}", target.key, e),
            }
            triggered.push(target.key.clone());
        }

        triggered
    }

    /// Polls until `token` is cancelled. A poll in progress always finishes.
    pub async fn run(mut self, token: CancellationToken) {
        info!(
            "Watching {} roots every {:?}",
            self.targets.len(),
            self.poll_interval
        );

        while !token.is_cancelled() {
            self.poll_once().await;

            core_async::select! {
                _ = token.cancelled() => break,
                _ = sleep(self.poll_interval) => {}
            }
        }

        info!("Change watcher stopped");
    }
}

fn emit(events: Option<&EventBus>, event: WatcherEvent) {
    if let Some(events) = events {
        let _ = events.emit(CoreEvent::Watcher(event));
    }
}
