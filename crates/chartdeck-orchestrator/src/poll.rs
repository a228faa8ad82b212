//! Bounded poll loop over a project record.
//!
//! The record is re-read from the store on every iteration. The build job
//! writes to it concurrently without any locking, so a cached copy would
//! never observe completion.

use std::time::Duration;

use chartdeck_state::{ProjectRecord, RecordStore, StateResult};
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

pub use chartdeck_core::PollSettings;

/// Aborts polls when the daemon shuts down.
///
/// Wraps the shutdown `watch` channel. A dropped sender never cancels.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    /// A cancellation that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is signalled.
    pub async fn cancelled(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return std::future::pending().await;
        };
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The predicate held for this freshly read record.
    Satisfied(ProjectRecord),
    /// The record does not exist (any more).
    NotFound,
    /// The deadline passed first. `last` is the final record observed.
    TimedOut { last: Option<ProjectRecord> },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Number of store reads performed.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Poll `id` until `predicate` holds, the record disappears, the deadline
/// passes, or `cancel` fires.
///
/// The first read happens immediately. Between reads the loop sleeps for
/// `settings.interval`, clamped so the last read lands on the deadline.
/// Store errors end the poll and are returned as errors.
pub async fn poll_record<S, F>(
    store: &S,
    id: &str,
    settings: PollSettings,
    cancel: &Cancellation,
    mut predicate: F,
) -> StateResult<PollReport>
where
    S: RecordStore + ?Sized,
    F: FnMut(&ProjectRecord) -> bool,
{
    let started = Instant::now();
    let deadline = started + settings.deadline;
    let mut cancel = cancel.clone();
    let mut attempts = 0u32;
    let mut last = None;

    let report = |outcome, attempts| PollReport {
        outcome,
        attempts,
        elapsed: started.elapsed(),
    };

    loop {
        if cancel.is_cancelled() {
            debug!(%id, attempts, "poll cancelled");
            return Ok(report(PollOutcome::Cancelled, attempts));
        }

        attempts += 1;
        match store.get(id)? {
            None => return Ok(report(PollOutcome::NotFound, attempts)),
            Some(record) if predicate(&record) => {
                debug!(%id, attempts, "poll condition met");
                return Ok(report(PollOutcome::Satisfied(record), attempts));
            }
            Some(record) => last = Some(record),
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(%id, attempts, "poll deadline reached");
            return Ok(report(PollOutcome::TimedOut { last }, attempts));
        }

        let wake = (now + settings.interval).min(deadline);
        tokio::select! {
            _ = sleep_until(wake) => {}
            _ = cancel.cancelled() => {
                debug!(%id, attempts, "poll cancelled while waiting");
                return Ok(report(PollOutcome::Cancelled, attempts));
            }
        }
    }
}
