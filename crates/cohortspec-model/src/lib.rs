//! Cohort specification model
//!
//! Query nodes and their canonical parameters, the per-operation builders in
//! [`patients`], the parameter validator and default resolver, the date-window
//! resolver, and [`CohortSpec`], the ordered mapping a backend compiles.

pub mod args;
pub mod categories;
pub mod codelist;
pub mod cohort;
pub mod config;
pub mod dates;
pub mod expectations;
pub mod node;
pub mod operation;
pub mod params;
pub mod pathogen;
pub mod patients;
pub mod returning;
mod validate;

pub use args::{argument_kind, ArgKind, ArgValue, Arguments};
pub use categories::{CategoryDefinitions, CategoryLabel, CategoryRule, DEFAULT_SENTINEL};
pub use codelist::{CodeEntry, Codelist, CodingSystem};
pub use cohort::CohortSpec;
pub use config::{ExpectationsPolicy, SpecConfig};
pub use dates::{BoundsRequirement, DateBounds, DateFormat, DateRef, DateWindow, WindowMode};
pub use expectations::{CategoryExpectation, DateExpectation, Distribution, Rate, ReturnExpectations};
pub use node::{EpisodeDefinition, QueryNode};
pub use operation::{Function, Operation};
pub use params::ParamValue;
pub use pathogen::{EpisodeDuration, PathogenTable};
pub use returning::{MatchingRule, ReturnShape, Returning, TestResult};
pub use validate::CARE_HOME_COLUMNS;

pub use cohortspec_diagnostics::{CohortError, Diagnostic, Result, Severity};
