// src/poll.rs

//! Convergence poller: probe remote state until it matches a wanted value or
//! a timeout elapses.
//!
//! A transient probe failure is "state unknown, keep waiting"; a probe that
//! never succeeds still fails at the timeout. The loop always returns within
//! `timeout` plus one probe interval.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, info};

/// Timing parameters for one poll.
#[derive(Debug, Clone)]
pub struct PollSpec {
    /// Total time budget; once elapsed, the poll fails.
    pub timeout: Duration,
    /// Fixed sleep between probes.
    pub probe_interval: Duration,
    /// Minimum spacing between "still waiting" notifications.
    pub notify_interval: Duration,
}

impl PollSpec {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            probe_interval: Duration::from_secs(2),
            notify_interval: Duration::from_secs(30),
        }
    }
}

/// Result of a poll, carrying the last observed state for diagnostics on
/// timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Converged(T),
    TimedOut { last_observed: Option<T> },
}

impl<T> PollOutcome<T> {
    pub fn converged(&self) -> bool {
        matches!(self, PollOutcome::Converged(_))
    }
}

/// Repeatedly invoke `probe` until `wanted` accepts the observed state or
/// `spec.timeout` elapses.
///
/// `what` names the thing being waited on, for log correlation only.
pub async fn poll_until<T, F, Fut, P>(
    spec: &PollSpec,
    what: &str,
    mut probe: F,
    wanted: P,
) -> PollOutcome<T>
where
    T: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
    P: Fn(&T) -> bool,
{
    let started = Instant::now();
    let mut last_notify = Instant::now();
    let mut last_observed: Option<T> = None;

    loop {
        match probe().await {
            Ok(state) => {
                if wanted(&state) {
                    debug!(
                        waiting_on = %what,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "state converged"
                    );
                    return PollOutcome::Converged(state);
                }
                last_observed = Some(state);
            }
            Err(err) => {
                // State unknown for this round; the timeout still applies.
                debug!(waiting_on = %what, error = %err, "probe failed; keeping waiting");
            }
        }

        if started.elapsed() >= spec.timeout {
            return PollOutcome::TimedOut { last_observed };
        }

        if last_notify.elapsed() >= spec.notify_interval {
            info!(
                waiting_on = %what,
                elapsed_secs = started.elapsed().as_secs(),
                observed = ?last_observed,
                "still waiting for convergence"
            );
            last_notify = Instant::now();
        }

        sleep(spec.probe_interval).await;
    }
}
