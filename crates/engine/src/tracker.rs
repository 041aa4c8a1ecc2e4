//! Async job tracker.
//!
//! Polls a job-status endpoint at a fixed interval until the job reaches a
//! terminal state, the polling ceiling is hit, the endpoint stops
//! answering, or the caller cancels.
//!
//! ## Polling rules
//!
//! - One request per interval, never overlapping: the next tick is not
//!   armed until the previous poll has resolved.
//! - The first poll happens one interval after tracking starts.
//! - The ceiling is checked at each interval boundary before polling; a job
//!   still `pending`/`running` when elapsed time reaches the ceiling
//!   resolves [`TerminalStatus::TimedOut`] at exactly that boundary.
//! - A transient poll failure is retried next interval; after
//!   [`TrackOptions::max_poll_failures`] consecutive failures the tracker
//!   resolves [`TerminalStatus::Unreachable`]. A successful poll resets the
//!   count.
//! - Cancellation resolves [`TerminalStatus::CancelledByCaller`]
//!   immediately; the server-side job is left alone.

use crate::cancel::CancelToken;
use opsdeck_core::{JobId, JobPoll, RemoteError, TerminalStatus};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};

/// Consecutive poll failures tolerated before giving up.
pub const DEFAULT_MAX_POLL_FAILURES: u32 = 3;

/// Tracking configuration. Interval and timeout are mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOptions {
    /// Fixed delay between polls
    pub interval: Duration,
    /// Ceiling on total tracking time
    pub timeout: Duration,
    /// Consecutive poll failures tolerated before `Unreachable`
    pub max_poll_failures: u32,
}

impl TrackOptions {
    /// Options with the default failure tolerance.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        TrackOptions {
            interval,
            timeout,
            max_poll_failures: DEFAULT_MAX_POLL_FAILURES,
        }
    }

    /// Override the consecutive-failure tolerance.
    pub fn with_max_poll_failures(mut self, max: u32) -> Self {
        self.max_poll_failures = max;
        self
    }
}

/// Poll `fetch_status` until the job resolves.
///
/// `fetch_status` receives an owned copy of the job id on every poll. The
/// returned status is always terminal; tracking itself never fails.
pub async fn track<F, Fut>(
    job_id: &JobId,
    mut fetch_status: F,
    options: &TrackOptions,
    cancel: &CancelToken,
) -> TerminalStatus
where
    F: FnMut(JobId) -> Fut,
    Fut: Future<Output = Result<JobPoll, RemoteError>>,
{
    let start = Instant::now();
    let mut consecutive_failures = 0u32;
    let mut polls = 0u64;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(target: "opsdeck::tracker", job = %job_id, polls, "tracking cancelled by caller");
                return TerminalStatus::CancelledByCaller;
            }
            () = time::sleep(options.interval) => {}
        }

        if start.elapsed() >= options.timeout {
            tracing::warn!(
                target: "opsdeck::tracker",
                job = %job_id,
                polls,
                timeout_ms = options.timeout.as_millis() as u64,
                "job tracking timed out"
            );
            return TerminalStatus::TimedOut;
        }

        let result = tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(target: "opsdeck::tracker", job = %job_id, polls, "tracking cancelled mid-poll");
                return TerminalStatus::CancelledByCaller;
            }
            res = fetch_status(job_id.clone()) => res,
        };
        polls += 1;

        match result {
            Ok(poll) => {
                consecutive_failures = 0;
                if let Some(terminal) = TerminalStatus::from_status(poll.status) {
                    tracing::info!(
                        target: "opsdeck::tracker",
                        job = %job_id,
                        status = %terminal,
                        polls,
                        "job reached terminal status"
                    );
                    return terminal;
                }
                tracing::debug!(
                    target: "opsdeck::tracker",
                    job = %job_id,
                    status = %poll.status,
                    progress = poll.progress,
                    "job still in progress"
                );
            }
            Err(err) => {
                consecutive_failures += 1;
                tracing::warn!(
                    target: "opsdeck::tracker",
                    job = %job_id,
                    error = %err,
                    consecutive_failures,
                    "status poll failed"
                );
                if consecutive_failures >= options.max_poll_failures {
                    return TerminalStatus::Unreachable;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_core::JobStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn opts(interval_ms: u64, timeout_ms: u64) -> TrackOptions {
        TrackOptions::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(timeout_ms),
        )
    }

    /// Fetcher that returns `running` a fixed number of times, then a
    /// terminal status, counting every poll it serves.
    fn scripted(
        running_polls: usize,
        terminal: JobStatus,
        counter: Arc<AtomicUsize>,
    ) -> impl FnMut(JobId) -> std::future::Ready<Result<JobPoll, RemoteError>> {
        move |_id| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = if n < running_polls {
                JobStatus::Running
            } else {
                terminal
            };
            std::future::ready(Ok(JobPoll::new(status)))
        }
    }

    // === Poll counting ===

    #[tokio::test(start_paused = true)]
    async fn resolves_after_exactly_n_plus_one_polls() {
        let polls = Arc::new(AtomicUsize::new(0));
        let fetch = scripted(4, JobStatus::Succeeded, polls.clone());

        let status = track(
            &JobId::from("sync-1"),
            fetch,
            &opts(50, 60_000),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(status, TerminalStatus::Succeeded);
        assert_eq!(polls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_terminal_takes_one_poll() {
        let polls = Arc::new(AtomicUsize::new(0));
        let fetch = scripted(0, JobStatus::Failed, polls.clone());

        let status = track(
            &JobId::from("sync-2"),
            fetch,
            &opts(50, 60_000),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(status, TerminalStatus::Failed);
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_cancelled_is_terminal() {
        let polls = Arc::new(AtomicUsize::new(0));
        let fetch = scripted(1, JobStatus::Cancelled, polls.clone());

        let status = track(
            &JobId::from("sync-3"),
            fetch,
            &opts(50, 60_000),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(status, TerminalStatus::Cancelled);
    }

    // === Timeout ceiling ===

    #[tokio::test(start_paused = true)]
    async fn times_out_at_exactly_the_ceiling() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let fetch = move |_id: JobId| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(JobPoll::new(JobStatus::Running)))
        };

        let start = Instant::now();
        // Ceiling of 3 intervals: polls at t=100 and t=200, timeout at t=300.
        let status = track(
            &JobId::from("sync-4"),
            fetch,
            &opts(100, 300),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(status, TerminalStatus::TimedOut);
        assert_eq!(polls.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_shorter_than_interval_means_zero_polls() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let fetch = move |_id: JobId| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(JobPoll::new(JobStatus::Running)))
        };

        let status = track(
            &JobId::from("sync-5"),
            fetch,
            &opts(100, 50),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(status, TerminalStatus::TimedOut);
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    // === Poll failures ===

    #[tokio::test(start_paused = true)]
    async fn consecutive_failures_resolve_unreachable() {
        let fetch = |_id: JobId| {
            std::future::ready(Err(RemoteError::Unreachable("connection refused".into())))
        };

        let status = track(
            &JobId::from("sync-6"),
            fetch,
            &opts(50, 60_000),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(status, TerminalStatus::Unreachable);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_poll_resets_failure_count() {
        // Two failures, one success, two failures, ... never reaches the
        // default tolerance of three consecutive, then succeeds.
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let fetch = move |_id: JobId| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let result = match n {
                0 | 1 | 3 | 4 => Err(RemoteError::Unreachable("flaky".into())),
                2 => Ok(JobPoll::new(JobStatus::Running)),
                _ => Ok(JobPoll::new(JobStatus::Succeeded)),
            };
            std::future::ready(result)
        };

        let status = track(
            &JobId::from("sync-7"),
            fetch,
            &opts(50, 60_000),
            &CancelToken::new(),
        )
        .await;

        assert_eq!(status, TerminalStatus::Succeeded);
        assert_eq!(polls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_tolerance_is_configurable() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let fetch = move |_id: JobId| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err(RemoteError::Unreachable("down".into())))
        };

        let options = opts(50, 60_000).with_max_poll_failures(1);
        let status = track(&JobId::from("sync-8"), fetch, &options, &CancelToken::new()).await;

        assert_eq!(status, TerminalStatus::Unreachable);
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    // === Cancellation ===

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_token_resolves_without_polling() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let fetch = move |_id: JobId| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(JobPoll::new(JobStatus::Running)))
        };

        let cancel = CancelToken::new();
        cancel.cancel();
        let status = track(&JobId::from("sync-9"), fetch, &opts(50, 60_000), &cancel).await;

        assert_eq!(status, TerminalStatus::CancelledByCaller);
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_an_in_progress_track() {
        let fetch =
            |_id: JobId| std::future::ready(Ok(JobPoll::new(JobStatus::Running)));

        let cancel = CancelToken::new();
        let canceller = cancel.clone();
        let job_id = JobId::from("sync-10");
        let handle = tokio::spawn(async move {
            track(&job_id, fetch, &opts(50, 60_000), &cancel).await
        });

        tokio::time::sleep(Duration::from_millis(175)).await;
        canceller.cancel();

        assert_eq!(handle.await.unwrap(), TerminalStatus::CancelledByCaller);
    }
}
