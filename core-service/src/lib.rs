//! Core service façade and bootstrap helpers.
//!
//! This crate turns a validated [`CoreConfig`] into running libraries: it
//! converts the configured layout into typed sources, wires the host bridges
//! (probe, notifier, clock) into the engine, and exposes the entry points
//! hosts call. Desktop builds enable the `desktop-shims` feature so the
//! `ffprobe` probe and HTTP notifier are injected by default.
//!
//! ## Entry points
//!
//! - per-library runs with a caller-supplied progress sink
//!   ([`MirrorService::sync_movies`], [`MirrorService::refresh_show`], ...)
//! - streamed runs ([`MirrorService::stream_library`])
//! - background loops ([`MirrorService::start_background`])
//! - destination browsing ([`MirrorService::browser`])

pub mod error;
mod refresh;

pub use error::{CoreError, Result};

pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, EventBus};
pub use core_sync::{
    LibraryKind, LibraryOutcome, ProgressLine, ProgressSink, Resolution, SyncMode, SyncRun,
};

use bridge_traits::LibraryNotifier;
use core_async::sync::{broadcast, mpsc, CancellationToken};
use core_async::task::{spawn, JoinHandle};
use core_runtime::config::{LibraryConfig, ScheduleConfig, WatchConfig};
use core_sync::{
    ChangeHandler, ChangeWatcher, ChannelSink, Classifier, DestinationBrowser, DiscardSink,
    Library, MediaSource, Orchestrator, PassOutcome, ScheduledPass, SyncError, SyncScheduler,
    WatchTarget,
};
use futures::FutureExt;
use refresh::RefreshRegistry;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};

struct ServiceInner {
    libraries: Vec<Library>,
    notifier: Option<Arc<dyn LibraryNotifier>>,
    events: EventBus,
    scheduler: ScheduleConfig,
    watcher: WatchConfig,
    enable_scheduler: bool,
    enable_watcher: bool,
    refreshes: RefreshRegistry,
}

/// Primary façade exposed to hosts. Cheap to clone.
#[derive(Clone)]
pub struct MirrorService {
    inner: Arc<ServiceInner>,
}

impl MirrorService {
    /// Builds every configured library.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::default();
        let probe = if config.features.enable_probe {
            config.media_probe.clone()
        } else {
            None
        };

        let libraries = config
            .libraries
            .iter()
            .map(|library| build_library(&config, library, Classifier::new(probe.clone()), &events))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Media mirror ready with {} libraries (probe: {}, notifier: {})",
            libraries.len(),
            probe.is_some(),
            config.library_notifier.is_some()
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                libraries,
                notifier: config.library_notifier.clone(),
                events,
                scheduler: config.scheduler.clone(),
                watcher: config.watcher.clone(),
                enable_scheduler: config.features.enable_scheduler,
                enable_watcher: config.features.enable_watcher,
                refreshes: RefreshRegistry::default(),
            }),
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.inner.events.subscribe()
    }

    pub fn library(&self, kind: LibraryKind) -> Option<&Library> {
        self.inner.libraries.iter().find(|l| l.kind() == kind)
    }

    fn require_library(&self, kind: LibraryKind) -> Result<&Library> {
        self.library(kind)
            .ok_or_else(|| CoreError::LibraryNotConfigured(kind.as_str().to_string()))
    }

    /// Read-only view of a library's destination tree.
    pub fn browser(&self, kind: LibraryKind) -> Result<DestinationBrowser> {
        Ok(DestinationBrowser::new(self.require_library(kind)?.destination()))
    }

    // ========================================================================
    // Runs
    // ========================================================================

    /// Runs every source of one library.
    ///
    /// A destructive refresh holds a per-title claim for its duration; a
    /// second one for the same title fails with
    /// [`SyncError::RefreshInProgress`]. The notifier is poked when anything
    /// changed.
    #[instrument(skip(self, run, sink), fields(kind = %kind, mode = %run.mode))]
    pub async fn run_library(
        &self,
        kind: LibraryKind,
        run: &SyncRun,
        sink: &dyn ProgressSink,
    ) -> Result<LibraryOutcome> {
        let library = self.require_library(kind)?;
        let _claim = match run.wipe_target(kind) {
            Some(title) => Some(self.inner.refreshes.acquire(kind, title)?),
            None => None,
        };

        let outcome = library.run(run, sink).await?;
        if outcome.changed {
            self.notify_changed();
        }
        Ok(outcome)
    }

    /// Runs one named source of a library.
    pub async fn run_source(
        &self,
        kind: LibraryKind,
        source: &str,
        run: &SyncRun,
        sink: &dyn ProgressSink,
    ) -> Result<PassOutcome> {
        let library = self.require_library(kind)?;
        let _claim = match run.wipe_target(kind) {
            Some(title) => Some(self.inner.refreshes.acquire(kind, title)?),
            None => None,
        };

        let outcome = library.run_source(source, run, sink).await?;
        if outcome.changed {
            self.notify_changed();
        }
        Ok(outcome)
    }

    pub async fn sync_movies(&self, mode: SyncMode, sink: &dyn ProgressSink) -> Result<LibraryOutcome> {
        self.run_library(LibraryKind::Movies, &SyncRun::with_mode(mode), sink)
            .await
    }

    pub async fn sync_tv(&self, mode: SyncMode, sink: &dyn ProgressSink) -> Result<LibraryOutcome> {
        self.run_library(LibraryKind::Tv, &SyncRun::with_mode(mode), sink)
            .await
    }

    /// Targeted refresh of one movie across all sources.
    pub async fn refresh_movie(
        &self,
        name: &str,
        wipe: bool,
        sink: &dyn ProgressSink,
    ) -> Result<LibraryOutcome> {
        let run = SyncRun::movie(name)?.with_wipe(wipe);
        self.run_library(LibraryKind::Movies, &run, sink).await
    }

    /// Targeted refresh of one show across all sources.
    pub async fn refresh_show(
        &self,
        name: &str,
        wipe: bool,
        sink: &dyn ProgressSink,
    ) -> Result<LibraryOutcome> {
        let run = SyncRun::show(name)?.with_wipe(wipe);
        self.run_library(LibraryKind::Tv, &run, sink).await
    }

    /// Targeted refresh of one episode; never wipes.
    pub async fn refresh_episode(
        &self,
        show: &str,
        code: &str,
        sink: &dyn ProgressSink,
    ) -> Result<LibraryOutcome> {
        let run = SyncRun::episode(show, code)?;
        self.run_library(LibraryKind::Tv, &run, sink).await
    }

    /// Movies then TV, skipping libraries that are not configured.
    pub async fn sync_all(&self, mode: SyncMode, sink: &dyn ProgressSink) -> Result<LibraryOutcome> {
        let mut total = LibraryOutcome::default();
        for kind in [LibraryKind::Movies, LibraryKind::Tv] {
            if self.library(kind).is_some() {
                total.merge(self.run_library(kind, &SyncRun::with_mode(mode), sink).await?);
            }
        }
        Ok(total)
    }

    /// Runs a library on a background task and streams its progress.
    ///
    /// The receiver closes when the run ends; the handle carries the outcome.
    pub fn stream_library(
        &self,
        kind: LibraryKind,
        run: SyncRun,
    ) -> (
        mpsc::UnboundedReceiver<ProgressLine>,
        JoinHandle<Result<LibraryOutcome>>,
    ) {
        let (sink, receiver) = ChannelSink::channel();
        let service = self.clone();
        let handle = spawn(async move { service.run_library(kind, &run, &sink).await });
        (receiver, handle)
    }

    fn notify_changed(&self) {
        let Some(notifier) = self.inner.notifier.clone() else {
            return;
        };
        spawn(async move {
            match notifier.request_refresh().await {
                Ok(()) => info!("Library refresh requested"),
                Err(e) => warn!("Library refresh request failed: {}", e),
            }
        });
    }

    // ========================================================================
    // Background loops
    // ========================================================================

    /// Starts the enabled background loops; they stop when `token` is
    /// cancelled.
    pub fn start_background(&self, token: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if self.inner.enable_scheduler {
            let scheduler = self.scheduler();
            let token = token.clone();
            handles.push(spawn(async move {
                scheduler.run(token).await;
            }));
        }

        if self.inner.enable_watcher {
            let watcher = self.watcher();
            handles.push(spawn(watcher.run(token)));
        }

        if handles.is_empty() {
            warn!("No background loops enabled");
        }
        handles
    }

    /// Periodic `sync_all`. The first failing source of an iteration is
    /// reported as the iteration's error.
    pub fn scheduler(&self) -> SyncScheduler {
        let service = self.clone();
        let pass: ScheduledPass =
            Arc::new(move |mode| scheduled_pass(service.clone(), mode).boxed());

        SyncScheduler::new(pass, self.inner.scheduler.interval)
            .with_full_pass_every(self.inner.scheduler.full_pass_every)
            .with_event_bus(self.inner.events.clone())
    }

    /// One watch target per source; a change re-runs only that source.
    pub fn watcher(&self) -> ChangeWatcher {
        let mut targets = Vec::new();
        for library in &self.inner.libraries {
            for source in library.sources() {
                let service = self.clone();
                let kind = library.kind();
                let name = source.name.clone();
                let handler: ChangeHandler = Arc::new(move || {
                    watched_source_changed(service.clone(), kind, name.clone()).boxed()
                });
                targets.push(WatchTarget::new(source.name.clone(), source.root.clone(), handler));
            }
        }

        ChangeWatcher::new(targets, self.inner.watcher.poll_interval)
            .with_event_bus(self.inner.events.clone())
    }
}

impl std::fmt::Debug for MirrorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorService")
            .field("libraries", &self.inner.libraries)
            .field("notifier", &self.inner.notifier.is_some())
            .finish()
    }
}

async fn scheduled_pass(service: MirrorService, mode: SyncMode) -> core_sync::Result<bool> {
    let outcome = service
        .sync_all(mode, &DiscardSink)
        .await
        .map_err(into_sync_error)?;
    match outcome.failures.into_iter().next() {
        Some(failure) => Err(failure.error),
        None => Ok(outcome.changed),
    }
}

async fn watched_source_changed(
    service: MirrorService,
    kind: LibraryKind,
    source: String,
) -> core_sync::Result<()> {
    service
        .run_source(kind, &source, &SyncRun::incremental(), &DiscardSink)
        .await
        .map(|_| ())
        .map_err(into_sync_error)
}

fn into_sync_error(err: CoreError) -> SyncError {
    match err {
        CoreError::Sync(e) => e,
        other => SyncError::Task(other.to_string()),
    }
}

fn build_library(
    config: &CoreConfig,
    library: &LibraryConfig,
    classifier: Classifier,
    events: &EventBus,
) -> Result<Library> {
    let kind = LibraryKind::from_str(&library.kind)?;

    let sources = library
        .sources
        .iter()
        .map(|source| {
            let resolution = Resolution::from_str(&source.default_resolution)?;
            Ok(MediaSource::new(
                source.name.clone(),
                source.root.clone(),
                source.watermark_path(&config.state_dir),
                resolution,
            )
            .with_priority(source.priority))
        })
        .collect::<Result<Vec<_>>>()?;

    let orchestrator = Orchestrator::new(kind, library.destination.clone(), classifier)
        .with_clock(Arc::clone(&config.clock))
        .with_event_bus(events.clone());

    Ok(Library::new(orchestrator, sources))
}
