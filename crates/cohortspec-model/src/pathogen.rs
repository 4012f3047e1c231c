//! Pathogen episode durations

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum gap between positive results that still belong to one episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeDuration {
    /// Results at most this many days after the previous one join the episode
    Days(u32),
    /// Once started, the episode never ends
    Infinite,
}

impl EpisodeDuration {
    /// Whether a result `gap_days` after the previous one stays in the episode
    pub fn joins(&self, gap_days: i64) -> bool {
        match self {
            Self::Days(limit) => gap_days <= i64::from(*limit),
            Self::Infinite => true,
        }
    }
}

impl fmt::Display for EpisodeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(n) => write!(f, "{n} days"),
            Self::Infinite => write!(f, "infinite"),
        }
    }
}

/// Pathogens covered by the laboratory data source, with their episode durations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathogenTable {
    durations: IndexMap<String, EpisodeDuration>,
}

impl PathogenTable {
    /// A table with no pathogens
    pub fn empty() -> Self {
        Self {
            durations: IndexMap::new(),
        }
    }

    pub fn with(mut self, pathogen: impl Into<String>, duration: EpisodeDuration) -> Self {
        self.durations.insert(pathogen.into(), duration);
        self
    }

    pub fn duration(&self, pathogen: &str) -> Option<EpisodeDuration> {
        self.durations.get(pathogen).copied()
    }

    pub fn supports(&self, pathogen: &str) -> bool {
        self.durations.contains_key(pathogen)
    }

    pub fn pathogens(&self) -> Vec<String> {
        self.durations.keys().cloned().collect()
    }
}

impl Default for PathogenTable {
    /// SGSS only carries SARS-CoV-2, whose episode length is set to indefinite
    fn default() -> Self {
        Self::empty().with("SARS-CoV-2", EpisodeDuration::Infinite)
    }
}
