//! # Sync Orchestrator
//!
//! Drives one pass over one [`MediaSource`] into a destination root.
//!
//! ## Per-entry pipeline
//!
//! ```text
//! scan (newest first, scoped to the title filter)
//!   → early stop (pure incremental only)
//!   → typed location
//!   → resolve target          broken → skip
//!   → episode filter
//!   → classify + tag          only when the name carries no tag yet
//!   → destination path
//!   → publish                 already present → no-op
//! ```
//!
//! Entry-level failures are reported and the pass moves on. Pass-level
//! failures (wipe, watermark read, task failure) end the pass with an error.
//!
//! ## Watermark policy
//!
//! The watermark is read and written only by pure incremental passes, and is
//! advanced to the pass start time only when something was tagged or
//! published. An entry that failed to publish therefore stays newer than the
//! watermark and is retried next time.

use crate::classifier::Classifier;
use crate::job::{EpisodeCode, SyncRun};
use crate::location::MediaLocation;
use crate::progress::{PassStats, ProgressEvent, ProgressLine, ProgressSink};
use crate::publisher::{publish, PublishOutcome};
use crate::scanner::{scan_symlinks, SymlinkEntry};
use crate::source::{LibraryKind, MediaSource};
use crate::tagger::{is_tagged, tag_in_place};
use crate::watermark::{human_time, is_at_or_before, WatermarkReport, WatermarkStore};
use crate::{Result, SyncError};
use bridge_traits::{Clock, SystemClock};
use chrono::Local;
use core_async::fs;
use core_async::time::Instant;
use core_runtime::events::{CoreEvent, EventBus, EventSeverity, SyncEvent};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Result of one source pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    /// Something was tagged or published
    pub changed: bool,
    pub stats: PassStats,
    pub watermark: WatermarkReport,
}

/// Runs passes for one library kind into one destination root.
#[derive(Clone)]
pub struct Orchestrator {
    kind: LibraryKind,
    destination: PathBuf,
    classifier: Classifier,
    clock: Arc<dyn Clock>,
    events: Option<EventBus>,
}

impl Orchestrator {
    pub fn new(kind: LibraryKind, destination: impl Into<PathBuf>, classifier: Classifier) -> Self {
        Self {
            kind,
            destination: destination.into(),
            classifier,
            clock: Arc::new(SystemClock),
            events: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mirrors every progress line onto the event bus.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn kind(&self) -> LibraryKind {
        self.kind
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Runs one pass of `source` as described by `run`.
    ///
    /// Pass-level failures are reported to `sink` before being returned.
    #[instrument(skip(self, source, run, sink), fields(kind = %self.kind, source = %source.name, mode = %run.mode))]
    pub async fn run_pass(
        &self,
        source: &MediaSource,
        run: &SyncRun,
        sink: &dyn ProgressSink,
    ) -> Result<PassOutcome> {
        let emitter = Emitter {
            sink,
            events: self.events.as_ref(),
            clock: self.clock.as_ref(),
            run_id: Uuid::new_v4().to_string(),
            source: source.name.clone(),
        };
        let started = Instant::now();

        emitter.bus(SyncEvent::Started {
            run_id: emitter.run_id.clone(),
            library: self.kind.as_str().to_string(),
            source: source.name.clone(),
            mode: run.mode.as_str().to_string(),
        });

        match self.execute(source, run, &emitter).await {
            Ok(outcome) => {
                let stats = &outcome.stats;
                emitter.bus(SyncEvent::Completed {
                    run_id: emitter.run_id.clone(),
                    source: source.name.clone(),
                    changed: outcome.changed,
                    scanned: stats.scanned,
                    tagged: stats.tagged,
                    published: stats.published,
                    skipped: stats.skipped + stats.already_linked,
                    failed: stats.failed,
                    duration_ms: started.elapsed().as_millis() as u64,
                });
                Ok(outcome)
            }
            Err(e) => {
                emitter.emit(ProgressEvent::PassFailed {
                    message: e.to_string(),
                });
                emitter.bus(SyncEvent::Failed {
                    run_id: emitter.run_id.clone(),
                    source: source.name.clone(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        source: &MediaSource,
        run: &SyncRun,
        emitter: &Emitter<'_>,
    ) -> Result<PassOutcome> {
        run.validate()?;

        let now = self.clock.now();
        let now_ts = now.timestamp();
        emitter.emit(ProgressEvent::Banner {
            kind: self.kind,
            started: now.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        });

        if let Some(title) = run.wipe_target(self.kind) {
            self.wipe(&self.destination.join(title), emitter).await?;
        }

        let store = WatermarkStore::new(&source.watermark_path);
        let pure = run.is_pure_incremental();
        let prev_ts = if pure { store.load().await? } else { 0 };

        self.emit_settings(source, run, prev_ts, emitter);

        let scan_root = match run.title_filter(self.kind) {
            Some(title) => source.root.join(title),
            None => source.root.clone(),
        };
        let entries = scan_symlinks(&scan_root).await?;
        debug!("Found {} symlinks under {}", entries.len(), scan_root.display());

        let mut stats = PassStats::default();
        for entry in &entries {
            if pure && is_at_or_before(entry.mod_time_nanos, prev_ts) {
                emitter.emit(ProgressEvent::StoppedEarly);
                break;
            }

            stats.scanned += 1;
            if let Err(e) = self.process_entry(source, run, entry, emitter, &mut stats).await {
                if !e.is_entry_level() {
                    return Err(e);
                }
                record_entry_error(&entry.link_path, e, emitter, &mut stats);
            }
        }

        let changed = stats.mutated();
        let watermark = if !pure {
            WatermarkReport::Skipped
        } else if !changed {
            WatermarkReport::Unchanged
        } else {
            match store.store(now_ts).await {
                Ok(()) => WatermarkReport::Advanced {
                    ts: now_ts,
                    human: human_time(now_ts),
                },
                Err(e) => WatermarkReport::Failed {
                    message: e.to_string(),
                },
            }
        };

        emitter.emit(ProgressEvent::Watermark(watermark.clone()));
        emitter.emit(ProgressEvent::Completed {
            kind: self.kind,
            stats,
        });

        Ok(PassOutcome {
            changed,
            stats,
            watermark,
        })
    }

    async fn wipe(&self, path: &Path, emitter: &Emitter<'_>) -> Result<()> {
        emitter.emit(ProgressEvent::Wiping {
            path: path.to_path_buf(),
        });
        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SyncError::Wipe {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn emit_settings(&self, source: &MediaSource, run: &SyncRun, prev_ts: i64, emitter: &Emitter<'_>) {
        let quoted = |value: Option<&str>| format!("'{}'", value.unwrap_or_default());

        emitter.emit(ProgressEvent::Setting {
            key: "SRC",
            value: source.root.display().to_string(),
        });
        emitter.emit(ProgressEvent::Setting {
            key: "PREV_TS",
            value: prev_ts.to_string(),
        });
        emitter.emit(ProgressEvent::Setting {
            key: "MODE",
            value: run.mode.to_string(),
        });

        match self.kind {
            LibraryKind::Tv => {
                emitter.emit(ProgressEvent::Setting {
                    key: "FILTER_SHOW",
                    value: quoted(run.show_filter.as_deref()),
                });
                emitter.emit(ProgressEvent::Setting {
                    key: "FILTER_EP",
                    value: quoted(run.episode_filter.as_ref().map(|c| c.as_str())),
                });
            }
            LibraryKind::Movies => {
                emitter.emit(ProgressEvent::Setting {
                    key: "FILTER_MOVIE",
                    value: quoted(run.movie_filter.as_deref()),
                });
            }
        }
    }

    async fn process_entry(
        &self,
        source: &MediaSource,
        run: &SyncRun,
        entry: &SymlinkEntry,
        emitter: &Emitter<'_>,
        stats: &mut PassStats,
    ) -> Result<()> {
        let link = &entry.link_path;
        let location = MediaLocation::parse(self.kind, &source.root, link)?;

        let target = fs::canonicalize(link)
            .await
            .map_err(|e| SyncError::BrokenLink {
                path: link.clone(),
                reason: e.to_string(),
            })?;

        if self.kind == LibraryKind::Tv {
            if let Some(wanted) = &run.episode_filter {
                if EpisodeCode::find_in(location.file()).as_ref() != Some(wanted) {
                    stats.skipped += 1;
                    return Ok(());
                }
            }
        }

        emitter.emit(ProgressEvent::New { link: link.clone() });

        let mut location = location;
        if !is_tagged(location.file()) {
            let classification = self
                .classifier
                .classify(&target, source.default_resolution)
                .await;
            emitter.emit(ProgressEvent::Classified {
                resolution: classification.resolution,
                tier: classification.tier,
            });

            let tagged_path = tag_in_place(link, classification.resolution).await?;
            let tagged_name = tagged_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            emitter.emit(ProgressEvent::Renamed {
                name: tagged_name.clone(),
            });
            stats.tagged += 1;
            location = location.with_file(tagged_name);
        }

        let dest = location.destination(&self.destination);
        match publish(&target, &dest).await? {
            PublishOutcome::Linked => {
                stats.published += 1;
                emitter.emit(ProgressEvent::Linked { dest });
            }
            PublishOutcome::AlreadyPresent => {
                stats.already_linked += 1;
                emitter.emit(ProgressEvent::AlreadyLinked { dest });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("kind", &self.kind)
            .field("destination", &self.destination)
            .field("classifier", &self.classifier)
            .field("events", &self.events.is_some())
            .finish()
    }
}

fn record_entry_error(link: &Path, err: SyncError, emitter: &Emitter<'_>, stats: &mut PassStats) {
    let event = match err {
        SyncError::BrokenLink { .. } => {
            stats.skipped += 1;
            ProgressEvent::BrokenLink {
                link: link.to_path_buf(),
            }
        }
        SyncError::UnexpectedLayout { reason, .. } => {
            stats.skipped += 1;
            ProgressEvent::OutOfLayout {
                link: link.to_path_buf(),
                reason,
            }
        }
        SyncError::RenameRace { .. } => {
            stats.skipped += 1;
            ProgressEvent::RenameRace {
                link: link.to_path_buf(),
            }
        }
        SyncError::TagConflict { path } => {
            stats.skipped += 1;
            ProgressEvent::TagConflict { path }
        }
        err @ SyncError::Publish { .. } => {
            stats.failed += 1;
            ProgressEvent::LinkFailed {
                message: err.to_string(),
            }
        }
        err => {
            stats.failed += 1;
            ProgressEvent::RenameFailed {
                message: err.to_string(),
            }
        }
    };
    emitter.emit(event);
}

/// Fans a pass's progress out to the sink, the log and the event bus.
struct Emitter<'a> {
    sink: &'a dyn ProgressSink,
    events: Option<&'a EventBus>,
    clock: &'a dyn Clock,
    run_id: String,
    source: String,
}

impl Emitter<'_> {
    fn emit(&self, event: ProgressEvent) {
        let line = ProgressLine {
            timestamp: self.clock.now(),
            source: self.source.clone(),
            event,
        };
        let message = line.event.to_string();
        let severity = line.severity();

        match severity {
            EventSeverity::Debug => debug!(source = %self.source, "{}", message),
            EventSeverity::Info => info!(source = %self.source, "{}", message),
            EventSeverity::Warning => warn!(source = %self.source, "{}", message),
            EventSeverity::Error => error!(source = %self.source, "{}", message),
        }

        self.bus(SyncEvent::Progress {
            run_id: self.run_id.clone(),
            source: self.source.clone(),
            message,
            severity,
        });
        self.sink.emit(line);
    }

    fn bus(&self, event: SyncEvent) {
        if let Some(events) = self.events {
            // No subscribers is not an error
            let _ = events.emit(CoreEvent::Sync(event));
        }
    }
}
