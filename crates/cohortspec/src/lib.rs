//! Declarative cohort specifications
//!
//! A cohort is an ordered set of named columns, each defined by a query node
//! built from the vocabulary in [`patients`]. Nodes are validated and their
//! defaults resolved when they are built, so a [`CohortSpec`] handed to a
//! backend is always complete.
//!
//! # Example
//!
//! ```
//! use cohortspec::{patients, CohortSpec};
//!
//! let cohort = CohortSpec::new()
//!     .column("population", patients::registered_as_of("2020-02-01").build()?)?
//!     .column("age", patients::age_as_of("2020-02-01").build()?)?
//!     .column("elderly", patients::categorised_as([(1, "age > 65"), (0, "DEFAULT")]).build()?)?;
//! assert_eq!(cohort.len(), 3);
//! # Ok::<(), cohortspec::CohortError>(())
//! ```

// Re-export all public APIs from internal crates
pub use cohortspec_ast as ast;
pub use cohortspec_backend as backend;
pub use cohortspec_diagnostics as diagnostics;
pub use cohortspec_eval as eval;
pub use cohortspec_model as model;
pub use cohortspec_parser as parser;

// Convenience re-exports
pub use cohortspec_diagnostics::{CohortError, Diagnostic, Result, Severity};
pub use cohortspec_model::{patients, Codelist, CohortSpec, QueryNode, SpecConfig};

pub mod load;

pub use load::StudyDefinition;

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
