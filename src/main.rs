//! `media-sync`: command-line front end for the media mirror.
//!
//! ```text
//! media-sync run --library tv --res both
//! media-sync run --library tv --show "Foo" --wipe
//! media-sync daemon --watch
//! media-sync list --library tv "Foo" "Season 01"
//! ```

use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use core_async::sync::CancellationToken;
use media_mirror::{
    init_logging, CoreConfig, LibraryConfig, LibraryKind, LibraryOutcome, LogFormat,
    LoggingConfig, MirrorService, NotifierConfig, ProbeConfig, ProgressLine, ProgressSink,
    ScheduleConfig, SourceConfig, SyncMode, SyncRun, WatchConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "media-sync")]
#[command(about = "Mirror symlinked media libraries into a tagged destination tree")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    paths: PathArgs,

    #[command(flatten)]
    runtime: RuntimeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct PathArgs {
    /// Directory holding per-source watermark files
    #[arg(long, env = "MEDIA_MIRROR_STATE_DIR", default_value = "/data/cache")]
    state_dir: PathBuf,

    #[arg(long, env = "MEDIA_MIRROR_MOVIES_DEST", default_value = "/media/movies")]
    movies_dest: PathBuf,

    #[arg(long, env = "MEDIA_MIRROR_SHOWS_DEST", default_value = "/media/shows")]
    shows_dest: PathBuf,

    #[arg(
        long,
        env = "MEDIA_MIRROR_MOVIES_4K",
        default_value = "/mnt/debrid/riven_symlinks/movies"
    )]
    movies_4k: PathBuf,

    #[arg(
        long,
        env = "MEDIA_MIRROR_MOVIES_1080",
        default_value = "/mnt/debrid_1080/riven_symlinks/movies"
    )]
    movies_1080: PathBuf,

    #[arg(
        long,
        env = "MEDIA_MIRROR_SHOWS_4K",
        default_value = "/mnt/debrid/riven_symlinks/shows"
    )]
    shows_4k: PathBuf,

    #[arg(
        long,
        env = "MEDIA_MIRROR_SHOWS_1080",
        default_value = "/mnt/debrid_1080/riven_symlinks/shows"
    )]
    shows_1080: PathBuf,
}

#[derive(ClapArgs, Debug, Clone)]
struct RuntimeArgs {
    /// Skip the ffprobe tier of resolution detection
    #[arg(long, env = "MEDIA_MIRROR_NO_PROBE", default_value_t = false)]
    no_probe: bool,

    #[arg(long, env = "MEDIA_MIRROR_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Media server base URL to ask for a library rescan after changes
    #[arg(long, env = "MEDIA_MIRROR_NOTIFY_URL")]
    notify_url: Option<String>,

    #[arg(long, env = "MEDIA_MIRROR_NOTIFY_KEY", default_value = "")]
    notify_key: String,

    /// pretty, json or compact
    #[arg(long, env = "MEDIA_MIRROR_LOG_FORMAT")]
    log_format: Option<String>,

    /// Full EnvFilter directive, e.g. "core_sync=debug,warn"
    #[arg(long, env = "MEDIA_MIRROR_LOG")]
    log_filter: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one pass and print progress to stdout
    Run(RunArgs),
    /// Run the scheduler (and optionally the watcher) until interrupted
    Daemon(DaemonArgs),
    /// Browse the destination tree
    List(ListArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LibraryChoice {
    Movies,
    Tv,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ResChoice {
    #[value(name = "4k")]
    Uhd,
    #[value(name = "1080")]
    Hd,
    Both,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    #[arg(long, value_enum, default_value = "all")]
    library: LibraryChoice,

    /// Which source mounts take part
    #[arg(long, value_enum, default_value = "both")]
    res: ResChoice,

    /// Ignore the watermark and walk everything
    #[arg(long)]
    full: bool,

    #[arg(long, conflicts_with = "show")]
    movie: Option<String>,

    #[arg(long)]
    show: Option<String>,

    /// Restrict a show refresh to one episode, e.g. S01E03
    #[arg(long, requires = "show")]
    episode: Option<String>,

    /// Remove the title's destination folder before relinking
    #[arg(long, conflicts_with = "episode")]
    wipe: bool,

    /// Override the root of the selected source
    #[arg(long)]
    src: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct DaemonArgs {
    /// Seconds between scheduled passes
    #[arg(long, env = "MEDIA_MIRROR_INTERVAL", default_value_t = 300)]
    interval: u64,

    /// Make every Nth scheduled pass a full one
    #[arg(long, env = "MEDIA_MIRROR_FULL_EVERY")]
    full_every: Option<u32>,

    /// Also poll source roots and re-sync a source when it changes
    #[arg(long, env = "MEDIA_MIRROR_WATCH", default_value_t = false)]
    watch: bool,

    /// Seconds between watcher polls
    #[arg(long, env = "MEDIA_MIRROR_POLL", default_value_t = 15)]
    poll: u64,
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    #[arg(long, value_enum, default_value = "tv")]
    library: LibraryChoice,

    title: Option<String>,

    season: Option<String>,
}

/// Prints each progress line as it arrives.
struct StdoutSink;

impl ProgressSink for StdoutSink {
    fn emit(&self, line: ProgressLine) {
        println!("{}", line);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let runtime = core_async::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        init_tracing(&cli)?;

        match &cli.command {
            Command::Run(args) => run_once(&cli, args).await,
            Command::Daemon(args) => run_daemon(&cli, args).await,
            Command::List(args) => list(&cli, args).await,
        }
    })
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let mut config = LoggingConfig::default();

    if let Some(format) = &cli.runtime.log_format {
        config = config.with_format(format.parse::<LogFormat>()?);
    }

    // Progress already goes to stdout for one-shot runs
    let filter = match (&cli.runtime.log_filter, &cli.command) {
        (Some(filter), _) => Some(filter.clone()),
        (None, Command::Run(_)) | (None, Command::List(_)) => Some("warn".to_string()),
        (None, Command::Daemon(_)) => None,
    };
    if let Some(filter) = filter {
        config = config.with_filter(filter);
    }

    init_logging(config).context("failed to initialise logging")
}

// ============================================================================
// Configuration
// ============================================================================

fn base_config(cli: &Cli) -> core_runtime::config::CoreConfigBuilder {
    let mut builder = CoreConfig::builder()
        .state_dir(cli.paths.state_dir.clone())
        .probe(ProbeConfig {
            program: cli.runtime.ffprobe.clone(),
            ..ProbeConfig::default()
        })
        .enable_probe(!cli.runtime.no_probe)
        .enable_scheduler(false)
        .enable_watcher(false);

    if let Some(url) = &cli.runtime.notify_url {
        builder = builder.notifier(NotifierConfig::new(url.clone(), cli.runtime.notify_key.clone()));
    }
    builder
}

fn selected_kinds(choice: LibraryChoice) -> Vec<LibraryKind> {
    match choice {
        LibraryChoice::Movies => vec![LibraryKind::Movies],
        LibraryChoice::Tv => vec![LibraryKind::Tv],
        LibraryChoice::All => vec![LibraryKind::Movies, LibraryKind::Tv],
    }
}

/// Library layout for `kind` limited to the mounts `res` selects.
fn library_config(
    paths: &PathArgs,
    kind: LibraryKind,
    res: ResChoice,
    src: Option<&PathBuf>,
) -> LibraryConfig {
    let (mut library, uhd_root, hd_root, prefix) = match kind {
        LibraryKind::Movies => (
            LibraryConfig::movies(paths.movies_dest.clone()),
            paths.movies_4k.clone(),
            paths.movies_1080.clone(),
            "movies",
        ),
        LibraryKind::Tv => (
            LibraryConfig::tv(paths.shows_dest.clone()),
            paths.shows_4k.clone(),
            paths.shows_1080.clone(),
            "tv",
        ),
    };

    if res != ResChoice::Hd {
        let root = src.cloned().unwrap_or(uhd_root);
        library = library.with_source(SourceConfig::new(format!("{}-4k", prefix), root, "2160p"));
    }
    if res != ResChoice::Uhd {
        let root = src.cloned().unwrap_or(hd_root);
        library = library.with_source(
            SourceConfig::new(format!("{}-1080", prefix), root, "1080p").with_priority(1),
        );
    }
    library
}

// ============================================================================
// Commands
// ============================================================================

async fn run_once(cli: &Cli, args: &RunArgs) -> anyhow::Result<()> {
    if args.src.is_some() && (args.library == LibraryChoice::All || args.res == ResChoice::Both) {
        bail!("--src needs a single --library and --res 4k or 1080");
    }
    if args.movie.is_some() && args.library == LibraryChoice::Tv {
        bail!("--movie applies to the movies library");
    }
    if args.show.is_some() && args.library == LibraryChoice::Movies {
        bail!("--show applies to the tv library");
    }

    let mut kinds = selected_kinds(args.library);
    if args.movie.is_some() {
        kinds = vec![LibraryKind::Movies];
    } else if args.show.is_some() {
        kinds = vec![LibraryKind::Tv];
    }

    let mut builder = base_config(cli);
    for kind in &kinds {
        builder = builder.library(library_config(&cli.paths, *kind, args.res, args.src.as_ref()));
    }
    let service = MirrorService::new(builder.build()?)?;

    let run = build_run(args)?;
    let mut total = LibraryOutcome::default();
    for kind in kinds {
        total.merge(service.run_library(kind, &run, &StdoutSink).await?);
    }

    for failure in &total.failures {
        warn!("Source {} failed: {}", failure.source, failure.error);
    }
    if !total.is_clean() {
        bail!("{} source(s) failed", total.failures.len());
    }
    Ok(())
}

fn build_run(args: &RunArgs) -> anyhow::Result<SyncRun> {
    let run = match (&args.movie, &args.show, &args.episode) {
        (Some(movie), _, _) => SyncRun::movie(movie.as_str())?.with_wipe(args.wipe),
        (None, Some(show), Some(code)) => SyncRun::episode(show.as_str(), code)?.with_wipe(args.wipe),
        (None, Some(show), None) => SyncRun::show(show.as_str())?.with_wipe(args.wipe),
        (None, None, _) => {
            if args.wipe {
                bail!("--wipe needs --movie or --show");
            }
            let mode = if args.full {
                SyncMode::Full
            } else {
                SyncMode::Incremental
            };
            SyncRun::with_mode(mode)
        }
    };
    Ok(run)
}

async fn run_daemon(cli: &Cli, args: &DaemonArgs) -> anyhow::Result<()> {
    let mut builder = base_config(cli)
        .enable_scheduler(true)
        .enable_watcher(args.watch)
        .scheduler(ScheduleConfig {
            interval: Duration::from_secs(args.interval),
            full_pass_every: args.full_every,
        })
        .watcher(WatchConfig {
            poll_interval: Duration::from_secs(args.poll),
        });
    for kind in [LibraryKind::Movies, LibraryKind::Tv] {
        builder = builder.library(library_config(&cli.paths, kind, ResChoice::Both, None));
    }
    let service = MirrorService::new(builder.build()?)?;

    let token = CancellationToken::new();
    let handles = service.start_background(token.clone());
    info!("media-sync daemon running; press Ctrl-C to stop");

    core_async::signal::shutdown()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");
    token.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Background task ended abnormally: {}", e);
        }
    }
    Ok(())
}

async fn list(cli: &Cli, args: &ListArgs) -> anyhow::Result<()> {
    let kind = match args.library {
        LibraryChoice::Movies => LibraryKind::Movies,
        LibraryChoice::Tv => LibraryKind::Tv,
        LibraryChoice::All => bail!("list needs --library movies or tv"),
    };

    let builder = base_config(cli)
        .enable_probe(false)
        .library(library_config(&cli.paths, kind, ResChoice::Both, None));
    let service = MirrorService::new(builder.build()?)?;
    let browser = service.browser(kind)?;

    let names = match (kind, &args.title, &args.season) {
        (_, None, _) => browser.list_titles().await?,
        (LibraryKind::Movies, Some(movie), _) => browser.list_movie_files(movie).await?,
        (LibraryKind::Tv, Some(show), None) => browser.list_seasons(show).await?,
        (LibraryKind::Tv, Some(show), Some(season)) => {
            browser.list_episodes(show, season).await?
        }
    };

    for name in names {
        println!("{}", name);
    }
    Ok(())
}
