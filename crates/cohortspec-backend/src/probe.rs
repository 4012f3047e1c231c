//! Readiness probe interface

use async_trait::async_trait;
use thiserror::Error;

/// Why a probe could not confirm readiness
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Connectivity error worth retrying
    #[error("transient: {0}")]
    Transient(String),

    /// The backend will not become ready; stop waiting
    #[error("fatal: {0}")]
    Fatal(String),
}

impl ProbeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Checks whether the backend accepts queries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// `Ok(true)` once ready, `Ok(false)` while still starting up
    async fn probe(&self) -> Result<bool, ProbeError>;
}
