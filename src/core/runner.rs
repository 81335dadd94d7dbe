//! # Run a single attempt of a stream.
//!
//! [`run_once`] opens the output feed of one identity and pumps lines into the
//! identity's [`StreamWriter`] until the feed ends, fails or the task is cancelled.
//!
//! ## Outcomes
//! ```text
//! open_logs ── Err ─────────────────────────────► Failed(err)
//!     │
//!     └─ Ok(stream) ─► next() ── Some(Ok(line)) ─► write_line, loop
//!                            ├── Some(Err(e)) ──► Failed(e)
//!                            └── None ──────────► Closed
//! token.cancelled() at any await ───────────────► Cancelled
//! ```
//!
//! ## Rules
//! - Cancellation is checked **first** at every await (biased select), so a
//!   cancelled task never opens a feed or reads another line.
//! - The report counts delivered lines; the actor uses the count for retry
//!   accounting.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::cluster::{LogFeed, LogRequest};
use crate::error::ClientError;
use crate::sink::StreamWriter;

/// How one attempt ended.
#[derive(Debug)]
pub(crate) enum AttemptEnd {
    /// The task token was cancelled.
    Cancelled,
    /// The feed ended cleanly.
    Closed,
    /// Opening or reading failed.
    Failed(ClientError),
}

/// Result of one attempt.
#[derive(Debug)]
pub(crate) struct AttemptReport {
    pub end: AttemptEnd,
    /// Lines delivered during this attempt.
    pub lines: u64,
}

impl AttemptReport {
    fn new() -> Self {
        Self {
            end: AttemptEnd::Closed,
            lines: 0,
        }
    }

    fn ended(mut self, end: AttemptEnd) -> Self {
        self.end = end;
        self
    }
}

/// Executes one attempt for `request`, writing every line to `writer`.
pub(crate) async fn run_once(
    feed: &dyn LogFeed,
    request: &LogRequest,
    writer: &mut StreamWriter,
    token: &CancellationToken,
) -> AttemptReport {
    let mut report = AttemptReport::new();

    let opened = tokio::select! {
        biased;
        _ = token.cancelled() => return report.ended(AttemptEnd::Cancelled),
        res = feed.open_logs(request) => res,
    };
    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => return report.ended(AttemptEnd::Failed(e)),
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return report.ended(AttemptEnd::Cancelled),
            item = stream.next() => item,
        };
        match next {
            Some(Ok(line)) => {
                report.lines += 1;
                writer.write_line(&line).await;
            }
            Some(Err(e)) => return report.ended(AttemptEnd::Failed(e)),
            None => return report.ended(AttemptEnd::Closed),
        }
    }
}
