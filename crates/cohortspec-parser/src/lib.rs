//! Category expression parser using Winnow
//!
//! Parses the boolean expressions used in `categorised_as` definitions with
//! recursive descent and precedence climbing:
//!
//! ```text
//! or      := and ( OR and )*
//! and     := not ( AND not )*
//! not     := NOT not | compare
//! compare := primary ( ( = | == | != | <> | < | <= | > | >= ) primary )?
//! primary := number | 'string' | "string" | TRUE | FALSE | NULL | column | ( or )
//! ```
//!
//! Keywords are case-insensitive. Every node carries its byte span in the
//! original expression text.

mod combinators;
mod expression;

pub use expression::parse_expression;
