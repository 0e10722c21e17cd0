//! # Multi-Source Merge
//!
//! A logical library (movies, TV) is fed by several sources, typically a 4K
//! mount and a 1080p mount. Each source runs its own pass, in priority order,
//! into the shared destination root. Resolutions coexist as differently
//! tagged siblings, so ordinary passes are independent of each other; order
//! only matters for a wipe, which is applied by the first source alone.

use crate::job::SyncRun;
use crate::orchestrator::{Orchestrator, PassOutcome};
use crate::progress::{PassStats, ProgressSink};
use crate::source::{LibraryKind, MediaSource};
use crate::{Result, SyncError};
use std::path::Path;
use tracing::{instrument, warn};

/// A source whose pass ended with a pass-level failure.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: SyncError,
}

/// Aggregate of one library run.
#[derive(Debug, Default)]
pub struct LibraryOutcome {
    /// OR of every source's `changed`
    pub changed: bool,
    pub stats: PassStats,
    pub failures: Vec<SourceFailure>,
}

impl LibraryOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Folds another library's outcome into this one.
    pub fn merge(&mut self, other: LibraryOutcome) {
        self.changed |= other.changed;
        self.stats.merge(&other.stats);
        self.failures.extend(other.failures);
    }

    fn absorb(&mut self, source: &str, result: Result<PassOutcome>) {
        match result {
            Ok(outcome) => {
                self.changed |= outcome.changed;
                self.stats.merge(&outcome.stats);
            }
            Err(error) => {
                warn!("Source {} failed: {}", source, error);
                self.failures.push(SourceFailure {
                    source: source.to_string(),
                    error,
                });
            }
        }
    }
}

/// One logical library and its ordered sources.
#[derive(Debug, Clone)]
pub struct Library {
    orchestrator: Orchestrator,
    sources: Vec<MediaSource>,
}

impl Library {
    /// Sources are ordered by priority; equal priorities keep their order.
    pub fn new(orchestrator: Orchestrator, mut sources: Vec<MediaSource>) -> Self {
        sources.sort_by_key(|s| s.priority);
        Self {
            orchestrator,
            sources,
        }
    }

    pub fn kind(&self) -> LibraryKind {
        self.orchestrator.kind()
    }

    pub fn destination(&self) -> &Path {
        self.orchestrator.destination()
    }

    pub fn sources(&self) -> &[MediaSource] {
        &self.sources
    }

    pub fn source(&self, name: &str) -> Option<&MediaSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Runs every source in order. A failing source does not stop the rest.
    #[instrument(skip(self, run, sink), fields(kind = %self.kind()))]
    pub async fn run(&self, run: &SyncRun, sink: &dyn ProgressSink) -> Result<LibraryOutcome> {
        run.validate()?;

        let mut outcome = LibraryOutcome::default();
        for (index, source) in self.sources.iter().enumerate() {
            let result = if index == 0 {
                self.orchestrator.run_pass(source, run, sink).await
            } else {
                self.orchestrator
                    .run_pass(source, &run.without_wipe(), sink)
                    .await
            };
            outcome.absorb(&source.name, result);
        }
        Ok(outcome)
    }

    /// Runs a single named source; a wipe is honoured as for a first source.
    pub async fn run_source(
        &self,
        name: &str,
        run: &SyncRun,
        sink: &dyn ProgressSink,
    ) -> Result<PassOutcome> {
        let source = self
            .source(name)
            .ok_or_else(|| SyncError::UnknownSource(name.to_string()))?;
        self.orchestrator.run_pass(source, run, sink).await
    }
}
