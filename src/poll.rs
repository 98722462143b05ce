//! Bounded polling of provider-side asynchronous tasks.
//!
//! The loop probes immediately, then pauses for a fixed interval between
//! attempts. It never sleeps after the final attempt, so a task that never
//! settles returns [`OpsError::Timeout`] within `max_attempts × interval`.
//! Dropping the returned future abandons the wait; the provider task itself
//! is unaffected.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::error::{Elapsed, OpsError};

/// Suspends the caller between poll attempts.
pub trait Pause: Send + Sync {
    /// Returns a future that completes after `duration`.
    fn pause(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// [`Pause`] backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioPause;

impl Pause for TokioPause {
    fn pause(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(sleep(duration))
    }
}

/// Fixed-interval retry budget.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Delay between consecutive attempts.
    pub interval: Duration,
    /// Maximum number of probes.
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Snapshot imports: every 15 seconds for up to 30 minutes.
    pub const SNAPSHOT_IMPORT: Self = Self {
        interval: Duration::from_secs(15),
        max_attempts: 120,
    };

    /// Creates a policy.
    #[must_use]
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on the time spent pausing.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// State reported by a single probe.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollStatus<T> {
    /// The task completed and produced a value.
    Ready(T),
    /// The task has not reached a terminal state yet.
    Pending,
    /// The task reached a failure state.
    Failed(String),
}

/// Successful poll result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PollOutcome<T> {
    /// Value produced by the final probe.
    pub value: T,
    /// Number of probes performed, including the successful one.
    pub attempts: u32,
    /// Wall-clock time spent polling.
    pub elapsed: Duration,
}

/// Probes until the task settles or the attempt budget is spent.
///
/// # Errors
///
/// Returns [`OpsError::TaskFailed`] when a probe reports a failure state,
/// [`OpsError::Timeout`] when the budget runs out, and any error raised by
/// the probe itself.
pub async fn poll_until<T, F, Fut>(
    operation: &str,
    policy: PollPolicy,
    pause: &dyn Pause,
    mut probe: F,
) -> Result<PollOutcome<T>, OpsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, OpsError>>,
{
    let started = Instant::now();
    for attempt in 1..=policy.max_attempts {
        match probe().await? {
            PollStatus::Ready(value) => {
                return Ok(PollOutcome {
                    value,
                    attempts: attempt,
                    elapsed: started.elapsed(),
                });
            }
            PollStatus::Failed(status) => {
                return Err(OpsError::TaskFailed {
                    operation: operation.to_owned(),
                    status,
                });
            }
            PollStatus::Pending => {}
        }
        if attempt < policy.max_attempts {
            pause.pause(policy.interval).await;
        }
    }

    Err(OpsError::Timeout {
        operation: operation.to_owned(),
        attempts: policy.max_attempts,
        elapsed: Elapsed(started.elapsed()),
    })
}
