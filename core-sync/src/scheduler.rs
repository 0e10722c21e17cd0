//! Periodic driver of sync passes.
//!
//! Each iteration runs in its own task so a panic inside a pass is caught and
//! logged like any other failure. The stop signal is observed between
//! iterations and during the sleep; a running iteration is never aborted.

use crate::job::SyncMode;
use crate::{Result, SyncError};
use core_async::sync::CancellationToken;
use core_async::task::spawn;
use core_async::time::{sleep, Duration};
use core_runtime::events::{CoreEvent, EventBus, SchedulerEvent};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

/// One scheduled unit of work. Resolves to whether anything changed.
pub type ScheduledPass = Arc<dyn Fn(SyncMode) -> BoxFuture<'static, Result<bool>> + Send + Sync>;

pub struct SyncScheduler {
    pass: ScheduledPass,
    interval: Duration,
    full_pass_every: Option<u32>,
    events: Option<EventBus>,
}

impl SyncScheduler {
    pub fn new(pass: ScheduledPass, interval: Duration) -> Self {
        Self {
            pass,
            interval,
            full_pass_every: None,
            events: None,
        }
    }

    /// Makes every `n`-th iteration a full pass.
    pub fn with_full_pass_every(mut self, n: Option<u32>) -> Self {
        self.full_pass_every = n.filter(|n| *n > 0);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Mode of the 1-based `iteration`.
    pub fn mode_for(&self, iteration: u64) -> SyncMode {
        match self.full_pass_every {
            Some(n) if iteration % u64::from(n) == 0 => SyncMode::Full,
            _ => SyncMode::Incremental,
        }
    }

    /// Runs one iteration and reports its failure, if any.
    pub async fn run_iteration(&self, iteration: u64) -> Result<bool> {
        let mode = self.mode_for(iteration);
        self.emit(SchedulerEvent::Tick {
            iteration,
            full: mode == SyncMode::Full,
        });
        info!("Scheduled {} sync #{}", mode, iteration);

        let result = match spawn((self.pass)(mode)).await {
            Ok(result) => result,
            Err(join_error) => Err(SyncError::from(join_error)),
        };

        if let Err(e) = &result {
            error!("Scheduled sync #{} failed: {}", iteration, e);
            self.emit(SchedulerEvent::IterationFailed {
                iteration,
                message: e.to_string(),
            });
        }
        result
    }

    /// Loops until `token` is cancelled and returns the iteration count.
    pub async fn run(self, token: CancellationToken) -> u64 {
        let mut iterations = 0u64;

        while !token.is_cancelled() {
            iterations += 1;
            // Failures are already reported; the next interval retries.
            let _ = self.run_iteration(iterations).await;

            core_async::select! {
                _ = token.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        info!("Scheduler stopped after {} iterations", iterations);
        self.emit(SchedulerEvent::Stopped { iterations });
        iterations
    }

    fn emit(&self, event: SchedulerEvent) {
        if let Some(events) = &self.events {
            let _ = events.emit(CoreEvent::Scheduler(event));
        }
    }
}

impl fmt::Debug for SyncScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncScheduler")
            .field("interval", &self.interval)
            .field("full_pass_every", &self.full_pass_every)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Mutex;

    fn recording_pass(modes: Arc<Mutex<Vec<SyncMode>>>) -> ScheduledPass {
        Arc::new(move |mode| {
            let modes = modes.clone();
            async move {
                modes.lock().unwrap().push(mode);
                Ok::<bool, SyncError>(false)
            }
            .boxed()
        })
    }

    #[test]
    fn test_mode_for_full_every() {
        let modes = Arc::new(Mutex::new(Vec::new()));
        let scheduler = SyncScheduler::new(recording_pass(modes), Duration::from_secs(1))
            .with_full_pass_every(Some(3));

        assert_eq!(scheduler.mode_for(1), SyncMode::Incremental);
        assert_eq!(scheduler.mode_for(3), SyncMode::Full);
        assert_eq!(scheduler.mode_for(6), SyncMode::Full);

        let never = SyncScheduler::new(
            recording_pass(Arc::new(Mutex::new(Vec::new()))),
            Duration::from_secs(1),
        )
        .with_full_pass_every(Some(0));
        assert_eq!(never.mode_for(10), SyncMode::Incremental);
    }

    #[tokio::test]
    async fn test_panicking_iteration_is_caught() {
        let pass: ScheduledPass = Arc::new(|_| {
            async {
                if true {
                    panic!("pass panic");
                }
                Ok::<bool, SyncError>(true)
            }
            .boxed()
        });
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let scheduler = SyncScheduler::new(pass, Duration::from_secs(1)).with_event_bus(bus);

        let result = scheduler.run_iteration(1).await;

        assert!(matches!(result, Err(SyncError::Task(_))));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CoreEvent::Scheduler(SchedulerEvent::Tick { iteration: 1, full: false })
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CoreEvent::Scheduler(SchedulerEvent::IterationFailed { iteration: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_loop_keeps_going_after_failures_and_stops_on_cancel() {
        let calls = Arc::new(Mutex::new(0u32));
        let counter = calls.clone();
        let pass: ScheduledPass = Arc::new(move |_| {
            let counter = counter.clone();
            async move {
                *counter.lock().unwrap() += 1;
                Err::<bool, _>(SyncError::Task("transient".to_string()))
            }
            .boxed()
        });

        let scheduler = SyncScheduler::new(pass, Duration::from_millis(5));
        let token = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(token.clone()));

        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel();
        let iterations = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(iterations >= 2);
        assert_eq!(*calls.lock().unwrap() as u64, iterations);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let modes = Arc::new(Mutex::new(Vec::new()));
        let scheduler =
            SyncScheduler::new(recording_pass(modes.clone()), Duration::from_millis(5));
        let token = CancellationToken::new();
        token.cancel();

        assert_eq!(scheduler.run(token).await, 0);
        assert!(modes.lock().unwrap().is_empty());
    }
}
