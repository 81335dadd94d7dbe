//! # StreamActor: single-identity supervisor.
//!
//! Supervises the output stream of one [`StreamIdentity`]:
//! - reconnects per [`BackoffPolicy`] (bounded consecutive failures),
//! - reopens the feed over the full history window on every attempt,
//! - optional admission via a global semaphore,
//! - cooperative cancellation via [`CancellationToken`].
//!
//! ## Architecture
//! ```text
//! StreamSupervisor::start ──► StreamActor::run()
//!
//! wait for predecessor (same identity) to finish
//! loop {
//!   ├─► acquire semaphore (optional, cancellable)
//!   ├─► run_once(feed, since=now-since) ──► lines ──► StreamWriter
//!   │       ▼
//!   │   Cancelled ─► break
//!   │   Closed / Failed(err) ─► publish Error(Fetch) on failure
//!   ├─► failures = 0 if the attempt delivered lines, else failures + 1
//!   ├─► failures == max_attempts ─► close writer, release slot,
//!   │                               publish Error(RetryExhausted), break
//!   └─► publish BackoffScheduled ─► sleep(backoff.next(failures - 1)) (cancellable)
//! }
//! close writer ─► publish StreamStopped
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** within one actor (never parallel).
//! - The writer lives across attempts: the tee file is opened once and appended to.
//! - An exhausted identity is untracked **before** `RetryExhausted` is published.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::{select, sync::Semaphore, time};
use tokio_util::sync::CancellationToken;

use crate::cluster::{LogFeed, LogRequest};
use crate::core::runner::{AttemptEnd, run_once};
use crate::core::slots::SlotTable;
use crate::error::StreamError;
use crate::events::{Event, EventKind};
use crate::identity::StreamIdentity;
use crate::policies::BackoffPolicy;
use crate::sink::StreamWriter;
use crate::subscribers::SubscriberSet;

/// Why an actor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActorExit {
    /// Cancelled by `stop*`, by the partition or by shutdown.
    Cancelled,
    /// Consecutive failures reached the attempt bound.
    Exhausted,
}

impl ActorExit {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ActorExit::Cancelled => "cancelled",
            ActorExit::Exhausted => "exhausted",
        }
    }
}

/// Supervises one identity's stream with retries, backoff and event publishing.
pub(crate) struct StreamActor {
    pub identity: StreamIdentity,
    pub feed: Arc<dyn LogFeed>,
    pub writer: StreamWriter,
    pub subs: SubscriberSet,
    pub backoff: BackoffPolicy,
    /// History window requested on every attempt.
    pub since: Duration,
    /// Optional global admission limiter.
    pub semaphore: Option<Arc<Semaphore>>,
    /// Table and slot id to release on exhaustion.
    pub slots: Arc<SlotTable<StreamIdentity>>,
    pub slot_id: u64,
    /// Predecessor under the same identity, still unwinding.
    pub after: Option<CancellationToken>,
}

impl StreamActor {
    /// Runs the actor until exhaustion or cancellation.
    pub(crate) async fn run(mut self, token: CancellationToken) -> ActorExit {
        let exit = self.supervise(&token).await;
        self.writer.close().await;
        self.subs.publish(
            Event::new(EventKind::StreamStopped)
                .with_identity(self.identity.clone())
                .with_reason(exit.as_str()),
        );
        exit
    }

    async fn supervise(&mut self, token: &CancellationToken) -> ActorExit {
        if let Some(prev) = self.after.take() {
            select! {
                biased;
                _ = token.cancelled() => return ActorExit::Cancelled,
                _ = prev.cancelled() => {}
            }
        }

        let mut failures: u32 = 0;
        let mut attempt: u32 = 0;

        loop {
            if token.is_cancelled() {
                return ActorExit::Cancelled;
            }
            let permit = match &self.semaphore {
                Some(sem) => {
                    select! {
                        biased;
                        _ = token.cancelled() => return ActorExit::Cancelled,
                        res = sem.clone().acquire_owned() => match res {
                            Ok(permit) => Some(permit),
                            Err(_closed) => return ActorExit::Cancelled,
                        },
                    }
                }
                None => None,
            };

            attempt = attempt.saturating_add(1);
            let request = LogRequest {
                identity: self.identity.clone(),
                since: window_start(self.since),
                follow: true,
            };
            let report = run_once(self.feed.as_ref(), &request, &mut self.writer, token).await;
            drop(permit);

            let last = match report.end {
                AttemptEnd::Cancelled => return ActorExit::Cancelled,
                AttemptEnd::Closed => String::from("feed closed"),
                AttemptEnd::Failed(source) => {
                    let last = source.to_string();
                    self.subs.publish(Event::error(StreamError::Fetch {
                        identity: self.identity.clone(),
                        attempt,
                        source,
                    }));
                    last
                }
            };

            failures = if report.lines > 0 { 0 } else { failures + 1 };
            if self.backoff.is_exhausted(failures) {
                self.writer.close().await;
                self.slots.release(&self.identity, self.slot_id).await;
                self.subs.publish(Event::error(StreamError::RetryExhausted {
                    identity: self.identity.clone(),
                    attempts: failures,
                    last,
                }));
                return ActorExit::Exhausted;
            }

            let delay = self.backoff.next(failures.saturating_sub(1));
            self.subs.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_identity(self.identity.clone())
                    .with_attempt(failures)
                    .with_delay(delay)
                    .with_reason(last),
            );

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => return ActorExit::Cancelled,
            }
        }
    }
}

/// Start of a history window of length `since` ending now, floored at the epoch.
fn window_start(since: Duration) -> SystemTime {
    SystemTime::now().checked_sub(since).unwrap_or(UNIX_EPOCH)
}
