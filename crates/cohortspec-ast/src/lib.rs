//! Category expression AST
//!
//! Category definitions and the `satisfying` sugar carry small boolean
//! expressions over other columns of the same cohort, for example
//! `age >= 65 AND (has_asthma OR has_copd)`. This crate defines the tree those
//! strings parse into; parsing lives in `cohortspec-parser` and evaluation in
//! `cohortspec-eval`.

mod expression;
mod literal;
mod operator;

pub use expression::*;
pub use literal::*;
pub use operator::*;

/// A node with source span information
pub type Spanned<T> = cohortspec_diagnostics::Spanned<T>;

/// Type alias for boxed expressions
pub type BoxExpr = Box<Spanned<Expr>>;
