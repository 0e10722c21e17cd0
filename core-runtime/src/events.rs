//! # Event Bus System
//!
//! Provides an event-driven architecture for the media mirror using `tokio::sync::broadcast`.
//! Sync passes, the change watcher and the scheduler publish typed events here
//! so that any number of observers (a CLI progress printer, a log shipper, a
//! status endpoint) can follow work they did not start.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for different domains
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐
//! │ Sync passes  ├────────────>│           │
//! └──────────────┘             │           │    subscribe    ┌────────────┐
//!                              │ EventBus  ├────────────────>│ Subscriber │
//! ┌──────────────┐    emit     │ (broadcast│                 └────────────┘
//! │ Watcher      ├────────────>│  channel) │
//! └──────────────┘             │           │    subscribe    ┌────────────┐
//! ┌──────────────┐    emit     │           ├────────────────>│ Subscriber │
//! │ Scheduler    ├────────────>│           │                 └────────────┘
//! └──────────────┘             └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, WatcherEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Watcher(WatcherEvent::ChangeDetected {
//!         key: "tv-4k".to_string(),
//!         root: "/mnt/debrid/riven_symlinks/shows".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Watcher(_)));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two types of errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Publishers never fail because nobody is listening: `emit` returns an error
//! in that case and callers discard it with `.ok()`.

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// A single pass over a large source can emit thousands of progress lines, so
/// the default is generous. Subscribers that can't keep up will receive
/// `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 1024;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Sync pass events
    Sync(SyncEvent),
    /// Change watcher events
    Watcher(WatcherEvent),
    /// Scheduler loop events
    Scheduler(SchedulerEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Watcher(e) => e.description(),
            CoreEvent::Scheduler(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Progress { severity, .. }) => *severity,
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Scheduler(SchedulerEvent::IterationFailed { .. }) => EventSeverity::Error,
            CoreEvent::Watcher(WatcherEvent::RootMissing { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Watcher(WatcherEvent::ChangeDetected { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events describing one pass over one source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Pass started.
    Started {
        /// Unique identifier for this pass.
        run_id: String,
        /// Library kind ("movies" or "tv").
        library: String,
        /// Source name.
        source: String,
        /// "full" or "incremental".
        mode: String,
    },
    /// One progress line of a pass.
    Progress {
        /// The pass ID.
        run_id: String,
        /// Source name.
        source: String,
        /// Rendered progress line.
        message: String,
        /// Severity of the underlying action.
        severity: EventSeverity,
    },
    /// Pass finished.
    Completed {
        /// The pass ID.
        run_id: String,
        /// Source name.
        source: String,
        /// Whether anything was tagged or published.
        changed: bool,
        /// Entries inspected.
        scanned: u64,
        /// Files renamed with a resolution tag.
        tagged: u64,
        /// Destination links created.
        published: u64,
        /// Entries skipped (filtered, broken, already linked).
        skipped: u64,
        /// Entries that failed.
        failed: u64,
        /// Wall time in milliseconds.
        duration_ms: u64,
    },
    /// Pass aborted by a pass-level failure.
    Failed {
        /// The pass ID.
        run_id: String,
        /// Source name.
        source: String,
        /// Human-readable error message.
        message: String,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::Progress { .. } => "Sync in progress",
            SyncEvent::Completed { .. } => "Sync completed",
            SyncEvent::Failed { .. } => "Sync failed",
        }
    }
}

// ============================================================================
// Watcher Events
// ============================================================================

/// Events from the change watcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum WatcherEvent {
    /// A watched root's fingerprint changed (or was observed for the first time).
    ChangeDetected {
        /// Watch target key.
        key: String,
        /// Watched root.
        root: String,
    },
    /// A watched root does not exist; it is skipped this round.
    RootMissing {
        /// Watch target key.
        key: String,
        /// Watched root.
        root: String,
    },
}

impl WatcherEvent {
    fn description(&self) -> &str {
        match self {
            WatcherEvent::ChangeDetected { .. } => "Source change detected",
            WatcherEvent::RootMissing { .. } => "Watched root missing",
        }
    }
}

// ============================================================================
// Scheduler Events
// ============================================================================

/// Events from the periodic scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SchedulerEvent {
    /// An iteration is starting.
    Tick {
        /// 1-based iteration counter.
        iteration: u64,
        /// Whether this iteration runs in full mode.
        full: bool,
    },
    /// An iteration returned an error or panicked.
    IterationFailed {
        /// 1-based iteration counter.
        iteration: u64,
        /// Human-readable error message.
        message: String,
    },
    /// The loop observed its stop signal and exited.
    Stopped {
        /// Iterations completed.
        iterations: u64,
    },
}

impl SchedulerEvent {
    fn description(&self) -> &str {
        match self {
            SchedulerEvent::Tick { .. } => "Scheduled sync starting",
            SchedulerEvent::IterationFailed { .. } => "Scheduled sync failed",
            SchedulerEvent::Stopped { .. } => "Scheduler stopped",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future events.
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering capabilities.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// let event_bus = EventBus::new(100);
/// let sync_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(changed: bool) -> CoreEvent {
        CoreEvent::Sync(SyncEvent::Completed {
            run_id: "run-1".to_string(),
            source: "tv-4k".to_string(),
            changed,
            scanned: 10,
            tagged: 2,
            published: 3,
            skipped: 5,
            failed: 0,
            duration_ms: 120,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(completed(true)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Sync(SyncEvent::Started {
            run_id: "run-1".to_string(),
            library: "tv".to_string(),
            source: "tv-4k".to_string(),
            mode: "incremental".to_string(),
        });

        assert_eq!(bus.emit(event.clone()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Watcher(_)));

        bus.emit(completed(false)).ok();

        let watcher_event = CoreEvent::Watcher(WatcherEvent::ChangeDetected {
            key: "movies-4k".to_string(),
            root: "/mnt/a/movies".to_string(),
        });
        bus.emit(watcher_event.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), watcher_event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for iteration in 0..5 {
            bus.emit(CoreEvent::Scheduler(SchedulerEvent::Tick {
                iteration,
                full: false,
            }))
            .ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Scheduler(SchedulerEvent::IterationFailed {
            iteration: 3,
            message: "watermark unwritable".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let progress = CoreEvent::Sync(SyncEvent::Progress {
            run_id: "run-1".to_string(),
            source: "tv-4k".to_string(),
            message: "broken link".to_string(),
            severity: EventSeverity::Warning,
        });
        assert_eq!(progress.severity(), EventSeverity::Warning);

        let missing = CoreEvent::Watcher(WatcherEvent::RootMissing {
            key: "tv-1080".to_string(),
            root: "/mnt/b/shows".to_string(),
        });
        assert_eq!(missing.severity(), EventSeverity::Warning);

        assert_eq!(completed(true).severity(), EventSeverity::Info);
        assert_eq!(
            CoreEvent::Scheduler(SchedulerEvent::Stopped { iterations: 4 }).severity(),
            EventSeverity::Debug
        );
    }

    #[test]
    fn test_event_description() {
        assert_eq!(completed(true).description(), "Sync completed");
        assert_eq!(
            CoreEvent::Scheduler(SchedulerEvent::Stopped { iterations: 1 }).description(),
            "Scheduler stopped"
        );
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(100);
        let mut sub = bus.subscribe();

        let bus1 = bus.clone();
        let bus2 = bus.clone();

        let handle1 = tokio::spawn(async move {
            for i in 0..10 {
                bus1.emit(CoreEvent::Watcher(WatcherEvent::ChangeDetected {
                    key: format!("key-{}", i),
                    root: "/mnt".to_string(),
                }))
                .ok();
            }
        });

        let handle2 = tokio::spawn(async move {
            for i in 0..10 {
                bus2.emit(CoreEvent::Scheduler(SchedulerEvent::Tick {
                    iteration: i,
                    full: false,
                }))
                .ok();
            }
        });

        handle1.await.ok();
        handle2.await.ok();

        let mut count = 0;
        while sub.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_event_serialization() {
        let event = completed(true);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("run-1"));
        assert!(json.contains("\"type\":\"Sync\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        bus.emit(completed(false)).ok();
        let received = stream.try_recv().unwrap().unwrap();
        assert_eq!(received, completed(false));
    }
}
