//! Cohort specification diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by every
//! cohortspec crate: structured error codes, the `CohortError` taxonomy and
//! advisory diagnostics collected while a cohort is being specified.

mod error;
mod error_code;
mod span;

pub use error::*;
pub use error_code::*;
pub use span::*;

/// Result type for cohort specification operations
pub type Result<T> = std::result::Result<T, CohortError>;
