//! # Progress Reporting
//!
//! A pass produces an ordered sequence of [`ProgressLine`]s. Orchestration
//! only builds structured events; where they go (a console, an HTTP stream, a
//! test buffer) is decided by the [`ProgressSink`] the caller passes in.

use crate::classifier::ClassificationTier;
use crate::source::{LibraryKind, Resolution};
use crate::watermark::WatermarkReport;
use chrono::{DateTime, Local, Utc};
use core_async::sync::mpsc;
use core_runtime::events::EventSeverity;
use std::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

/// Per-pass counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Entries that passed the scope filters
    pub scanned: u64,
    pub tagged: u64,
    pub published: u64,
    pub already_linked: u64,
    /// Broken, out-of-layout or episode-filtered entries
    pub skipped: u64,
    pub failed: u64,
}

impl PassStats {
    pub fn merge(&mut self, other: &PassStats) {
        self.scanned += other.scanned;
        self.tagged += other.tagged;
        self.published += other.published;
        self.already_linked += other.already_linked;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub fn mutated(&self) -> bool {
        self.tagged > 0 || self.published > 0
    }
}

impl fmt::Display for PassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {}, tagged {}, published {}, already linked {}, skipped {}, failed {}",
            self.scanned, self.tagged, self.published, self.already_linked, self.skipped, self.failed
        )
    }
}

/// Something a pass did or decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Banner { kind: LibraryKind, started: String },
    Setting { key: &'static str, value: String },
    Wiping { path: PathBuf },
    StoppedEarly,
    BrokenLink { link: PathBuf },
    OutOfLayout { link: PathBuf, reason: String },
    New { link: PathBuf },
    Classified { resolution: Resolution, tier: ClassificationTier },
    Renamed { name: String },
    RenameRace { link: PathBuf },
    RenameFailed { message: String },
    TagConflict { path: PathBuf },
    AlreadyLinked { dest: PathBuf },
    Linked { dest: PathBuf },
    LinkFailed { message: String },
    Watermark(WatermarkReport),
    PassFailed { message: String },
    Completed { kind: LibraryKind, stats: PassStats },
}

impl ProgressEvent {
    pub fn severity(&self) -> EventSeverity {
        match self {
            ProgressEvent::Classified { .. } | ProgressEvent::Setting { .. } => EventSeverity::Debug,
            ProgressEvent::BrokenLink { .. }
            | ProgressEvent::OutOfLayout { .. }
            | ProgressEvent::RenameRace { .. }
            | ProgressEvent::TagConflict { .. } => EventSeverity::Warning,
            ProgressEvent::RenameFailed { .. }
            | ProgressEvent::LinkFailed { .. }
            | ProgressEvent::PassFailed { .. }
            | ProgressEvent::Watermark(WatermarkReport::Failed { .. }) => EventSeverity::Error,
            _ => EventSeverity::Info,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Banner { kind, started } => write!(
                f,
                "================ {} SYNC: {} ================",
                kind.heading(),
                started
            ),
            ProgressEvent::Setting { key, value } => write!(f, " {:<12} = {}", key, value),
            ProgressEvent::Wiping { path } => {
                write!(f, "Removing destination folder: {}", path.display())
            }
            ProgressEvent::StoppedEarly => f.write_str("Stopping early: symlink <= last-run"),
            ProgressEvent::BrokenLink { link } => write!(f, "Broken symlink: {}", link.display()),
            ProgressEvent::OutOfLayout { link, reason } => {
                write!(f, "Skipping {}: {}", link.display(), reason)
            }
            ProgressEvent::New { link } => write!(f, "NEW: {}", link.display()),
            ProgressEvent::Classified { resolution, tier } => {
                write!(f, " Resolution: {} ({})", resolution, tier)
            }
            ProgressEvent::Renamed { name } => write!(f, " RENAMED: {}", name),
            ProgressEvent::RenameRace { link } => {
                write!(f, " Source vanished before rename: {}", link.display())
            }
            ProgressEvent::RenameFailed { message } => write!(f, " {}", message),
            ProgressEvent::TagConflict { path } => {
                write!(f, " Tagged name already exists: {}", path.display())
            }
            ProgressEvent::AlreadyLinked { dest } => {
                write!(f, " Already linked: {}", dest.display())
            }
            ProgressEvent::Linked { dest } => write!(f, " Linked: {}", dest.display()),
            ProgressEvent::LinkFailed { message } => write!(f, " {}", message),
            ProgressEvent::Watermark(report) => write!(f, "{}", report),
            ProgressEvent::PassFailed { message } => write!(f, "Pass failed: {}", message),
            ProgressEvent::Completed { kind, stats } => {
                write!(f, "{} SYNC COMPLETE ({})", kind.heading(), stats)
            }
        }
    }
}

/// One timestamped progress line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLine {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub event: ProgressEvent,
}

impl ProgressLine {
    pub fn severity(&self) -> EventSeverity {
        self.event.severity()
    }
}

impl fmt::Display for ProgressLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.with_timezone(&Local).format("%H:%M:%S"),
            self.event
        )
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Receives progress lines in order.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, line: ProgressLine);
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl ProgressSink for DiscardSink {
    fn emit(&self, _line: ProgressLine) {}
}

/// Buffers lines in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<ProgressLine>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<ProgressLine> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Message text of every line so far, without timestamps.
    pub fn messages(&self) -> Vec<String> {
        self.lines().iter().map(|l| l.event.to_string()).collect()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, line: ProgressLine) {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }
}

/// Forwards lines to an unbounded channel; a closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ProgressLine>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<ProgressLine>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressLine>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, line: ProgressLine) {
        let _ = self.sender.send(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(event: ProgressEvent) -> ProgressLine {
        ProgressLine {
            timestamp: Utc::now(),
            source: "tv-4k".to_string(),
            event,
        }
    }

    #[test]
    fn test_line_wording() {
        assert_eq!(
            ProgressEvent::New {
                link: PathBuf::from("/src/Foo/S01/a.mkv")
            }
            .to_string(),
            "NEW: /src/Foo/S01/a.mkv"
        );
        assert_eq!(
            ProgressEvent::Renamed {
                name: "a - 1080p.mkv".to_string()
            }
            .to_string(),
            " RENAMED: a - 1080p.mkv"
        );
        assert_eq!(
            ProgressEvent::Setting {
                key: "SRC",
                value: "/src".to_string()
            }
            .to_string(),
            " SRC          = /src"
        );
        assert_eq!(
            ProgressEvent::Completed {
                kind: LibraryKind::Tv,
                stats: PassStats::default()
            }
            .to_string(),
            "TV SYNC COMPLETE (scanned 0, tagged 0, published 0, already linked 0, skipped 0, failed 0)"
        );
    }

    #[test]
    fn test_line_carries_timestamp() {
        let timestamp = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let line = ProgressLine {
            timestamp,
            source: "movies-4k".to_string(),
            event: ProgressEvent::StoppedEarly,
        };
        assert_eq!(
            line.to_string(),
            format!(
                "[{}] Stopping early: symlink <= last-run",
                timestamp.with_timezone(&Local).format("%H:%M:%S")
            )
        );
    }

    #[test]
    fn test_severity() {
        assert_eq!(ProgressEvent::StoppedEarly.severity(), EventSeverity::Info);
        assert_eq!(
            ProgressEvent::BrokenLink {
                link: PathBuf::from("/x")
            }
            .severity(),
            EventSeverity::Warning
        );
        assert_eq!(
            ProgressEvent::Watermark(WatermarkReport::Failed {
                message: "denied".to_string()
            })
            .severity(),
            EventSeverity::Error
        );
    }

    #[test]
    fn test_stats_mutated_and_merge() {
        let mut total = PassStats::default();
        assert!(!total.mutated());
        total.merge(&PassStats {
            published: 2,
            already_linked: 1,
            ..PassStats::default()
        });
        assert!(total.mutated());
        assert_eq!(total.already_linked, 1);
    }

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.emit(line(ProgressEvent::StoppedEarly));
        sink.emit(line(ProgressEvent::Watermark(WatermarkReport::Unchanged)));
        assert_eq!(
            sink.messages(),
            vec![
                "Stopping early: symlink <= last-run".to_string(),
                "No changes detected; timestamp not updated.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_channel_sink_survives_closed_receiver() {
        let (sink, mut rx) = ChannelSink::channel();
        sink.emit(line(ProgressEvent::StoppedEarly));
        assert_eq!(rx.recv().await.unwrap().event, ProgressEvent::StoppedEarly);

        drop(rx);
        sink.emit(line(ProgressEvent::StoppedEarly));
    }
}
