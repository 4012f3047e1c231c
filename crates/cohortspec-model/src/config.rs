//! Cohort specification settings

use crate::pathogen::PathogenTable;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// What to do when a column omits conventionally required expectations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectationsPolicy {
    /// Accept silently
    Ignore,
    /// Record a warning diagnostic
    #[default]
    Warn,
    /// Reject the column
    Deny,
}

impl FromStr for ExpectationsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "warn" => Ok(Self::Warn),
            "deny" => Ok(Self::Deny),
            other => Err(format!("unknown expectations policy '{other}' (expected ignore, warn or deny)")),
        }
    }
}

/// Settings injected into a cohort specification and its builders
#[derive(Debug, Clone, Default)]
pub struct SpecConfig {
    pub expectations_policy: ExpectationsPolicy,
    pub pathogens: Arc<PathogenTable>,
}

impl SpecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: ExpectationsPolicy) -> Self {
        self.expectations_policy = policy;
        self
    }

    pub fn with_pathogens(mut self, pathogens: PathogenTable) -> Self {
        self.pathogens = Arc::new(pathogens);
        self
    }
}
