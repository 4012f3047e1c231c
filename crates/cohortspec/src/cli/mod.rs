//! Command-line tooling for study definitions
//!
//! - `validate`: load and check study definition files
//! - `compile`: emit the resolved cohort as JSON

pub mod compile;
pub mod output;
pub mod validate;
