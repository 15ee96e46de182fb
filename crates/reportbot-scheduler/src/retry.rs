//! Bounded retry jobs: run a check on a fixed attempt budget with linearly
//! increasing delay until it reports done.
//!
//! Attempt `i` waits `unit * i` after the previous wakeup, so attempt `i`
//! fires `unit * i*(i+1)/2` after the job started. Check errors are logged and
//! consume the attempt; they never end the job early.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Attempt budget and delay unit of a retry job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Base delay; attempt `i` sleeps `unit * i` first.
    pub unit: Duration,
    /// Upper bound on check invocations.
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const fn new(unit: Duration, max_attempts: u32) -> Self {
        Self { unit, max_attempts }
    }

    /// Sleep preceding attempt `attempt` (1-based).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.unit.checked_mul(attempt).unwrap_or(Duration::MAX)
    }

    /// Time from job start until attempt `attempt` fires.
    pub fn elapsed_before(&self, attempt: u32) -> Duration {
        let steps = u64::from(attempt) * (u64::from(attempt) + 1) / 2;
        u32::try_from(steps)
            .ok()
            .and_then(|s| self.unit.checked_mul(s))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    /// Five attempts on a 30 second unit.
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 5)
    }
}

/// Context handed to every check invocation.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    pub max_attempts: u32,
    /// Cancelled when the job's handle is cancelled.
    pub token: CancellationToken,
}

/// How a retry job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The check reported done on this attempt.
    Completed { attempt: u32 },
    /// Every attempt ran without the check reporting done.
    Exhausted { attempts: u32 },
    /// Cancelled through the handle after this many attempts ran.
    Cancelled { after_attempts: u32 },
}

/// Handle to a running retry job. Dropping it leaves the job running.
#[derive(Debug)]
pub struct RetryHandle {
    token: CancellationToken,
    task: JoinHandle<RetryOutcome>,
}

impl RetryHandle {
    /// Ask the job to stop. Takes effect at the next sleep.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job to end.
    pub async fn join(self) -> Result<RetryOutcome, JoinError> {
        self.task.await
    }
}

/// Spawn a retry job and return immediately.
///
/// `check` returns `Ok(true)` when the watched condition holds, `Ok(false)`
/// to try again later, and `Err` for a transient failure that is logged and
/// retried. `label` only appears in logs.
pub fn schedule<F, Fut, E>(label: impl Into<String>, policy: RetryPolicy, check: F) -> RetryHandle
where
    F: FnMut(Attempt) -> Fut + Send + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let token = CancellationToken::new();
    let task = tokio::spawn(run(label.into(), policy, token.clone(), check));
    RetryHandle { token, task }
}

async fn run<F, Fut, E>(
    label: String,
    policy: RetryPolicy,
    token: CancellationToken,
    mut check: F,
) -> RetryOutcome
where
    F: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: Display,
{
    tracing::debug!(
        "⏳ Retry job '{}' started ({} attempts, unit {:?})",
        label,
        policy.max_attempts,
        policy.unit
    );

    for number in 1..=policy.max_attempts {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("🛑 Retry job '{}' cancelled after {} attempt(s)", label, number - 1);
                return RetryOutcome::Cancelled { after_attempts: number - 1 };
            }
            _ = tokio::time::sleep(policy.delay_before(number)) => {}
        }

        let attempt = Attempt {
            number,
            max_attempts: policy.max_attempts,
            token: token.clone(),
        };
        match check(attempt).await {
            Ok(true) => {
                tracing::debug!("✅ Retry job '{}' done on attempt {}", label, number);
                return RetryOutcome::Completed { attempt: number };
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    "⚠️ Retry job '{}' attempt {}/{} failed: {}",
                    label,
                    number,
                    policy.max_attempts,
                    e
                );
            }
        }
    }

    tracing::debug!("⌛ Retry job '{}' expired", label);
    RetryOutcome::Exhausted {
        attempts: policy.max_attempts,
    }
}
