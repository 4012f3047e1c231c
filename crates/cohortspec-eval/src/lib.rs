//! Reference evaluators for cohort specifications
//!
//! These evaluators run in memory over a single patient's data. They are
//! not a query engine: they exist to make the semantic contracts a backend
//! compiler must reproduce executable and testable.
//!
//! - [`expression`]: three-valued evaluation of category expressions
//! - [`categorise`]: first-match `categorised_as` evaluation
//! - [`episodes`]: episode grouping and SGSS result handling
//! - [`matching`]: code list matching and return shapes for event queries

pub mod categorise;
pub mod episodes;
pub mod expression;
pub mod matching;
pub mod value;

pub use categorise::CategoriseExt;
pub use episodes::{group_into_episodes, sgss_events, Episode, SgssRecord};
pub use expression::{evaluate, evaluate_condition};
pub use matching::{evaluate_events, evaluate_sgss, CodedEvent, Match, ReturnValue};
pub use value::{row, Columns, EvalValue};
