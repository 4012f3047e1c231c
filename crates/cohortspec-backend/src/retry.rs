//! Bounded readiness polling

use crate::probe::{ProbeError, ReadinessProbe};
use cohortspec_diagnostics::{CohortError, Result, COH0402, COH0403, COH0404};
use std::time::Duration;
use tokio::time::{self, Instant};

/// Environment variable overriding the readiness timeout, in seconds
pub const CONNECTION_RETRY_TIMEOUT: &str = "CONNECTION_RETRY_TIMEOUT";

/// How often and how long to wait for a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self { poll_interval, timeout }
    }

    /// Default policy, with the timeout taken from `CONNECTION_RETRY_TIMEOUT` if set
    pub fn from_env() -> Result<Self> {
        Self::default().with_timeout_text(std::env::var(CONNECTION_RETRY_TIMEOUT).ok().as_deref())
    }

    /// Override the timeout with a number of seconds given as text
    pub fn with_timeout_text(self, seconds: Option<&str>) -> Result<Self> {
        let Some(text) = seconds else {
            return Ok(self);
        };
        let timeout = text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .ok_or_else(|| {
                CohortError::system(
                    COH0402,
                    format!("{CONNECTION_RETRY_TIMEOUT}={text:?} is not a non-negative number of seconds"),
                )
            })?;
        Ok(Self { timeout, ..self })
    }
}

fn not_ready(policy: &RetryPolicy, attempts: u32) -> CohortError {
    CohortError::system(
        COH0403,
        format!("backend not ready after {:?} ({attempts} attempts)", policy.timeout),
    )
}

/// Poll `probe` until it reports ready or the policy's timeout elapses
///
/// `Ok(false)` and transient errors are retried every `poll_interval`. A
/// fatal error stops immediately. Each probe call is bounded by the time left,
/// so a probe that never returns counts against the budget.
pub async fn wait_until_ready(probe: &dyn ReadinessProbe, policy: &RetryPolicy) -> Result<()> {
    let deadline = Instant::now() + policy.timeout;
    let mut attempts = 0u32;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(not_ready(policy, attempts));
        }

        attempts += 1;
        match time::timeout(remaining, probe.probe()).await {
            Ok(Ok(true)) => {
                log::info!("backend ready after {attempts} attempt(s)");
                return Ok(());
            }
            Ok(Ok(false)) => log::debug!("backend not ready yet (attempt {attempts})"),
            Ok(Err(ProbeError::Transient(message))) => {
                log::debug!("readiness probe failed (attempt {attempts}): {message}");
            }
            Ok(Err(ProbeError::Fatal(message))) => {
                return Err(CohortError::system(
                    COH0404,
                    format!("readiness probe failed: {message}"),
                ));
            }
            Err(_) => {
                log::warn!("readiness probe did not return within the remaining budget");
                return Err(not_ready(policy, attempts));
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        time::sleep(policy.poll_interval.min(remaining)).await;
    }
}
