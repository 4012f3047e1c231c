//! Backend readiness
//!
//! A cohort specification is only compiled and run once the backend data
//! store accepts connections. This crate defines the probe a backend
//! implements and the bounded polling loop that waits on it. Nothing else in
//! cohortspec retries.

mod probe;
mod retry;

pub use probe::{ProbeError, ReadinessProbe};
pub use retry::{wait_until_ready, RetryPolicy, CONNECTION_RETRY_TIMEOUT};
