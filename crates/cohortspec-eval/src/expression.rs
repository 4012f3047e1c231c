//! Category expression evaluation
//!
//! Logical operators follow three-valued logic:
//!
//! - `AND`: false dominates (null AND false = false)
//! - `OR`: true dominates (null OR true = true)
//! - `NOT NULL` is null
//! - a comparison with a null operand is null

use crate::value::{Columns, EvalValue};
use cohortspec_ast::{BinaryOp, Expr, Expression, Spanned};
use cohortspec_diagnostics::{CohortError, Result, COH0200, COH0201, COH0202};
use std::cmp::Ordering;

/// Evaluate `expression` against one patient's column values
pub fn evaluate(expression: &Expression, row: &impl Columns) -> Result<EvalValue> {
    Evaluator { row }.eval(&expression.root)
}

/// Evaluate `expression` as a condition: `Some(true)`, `Some(false)` or unknown
pub fn evaluate_condition(expression: &Expression, row: &impl Columns) -> Result<Option<bool>> {
    Ok(evaluate(expression, row)?.truthiness())
}

struct Evaluator<'r, C> {
    row: &'r C,
}

impl<C: Columns> Evaluator<'_, C> {
    fn eval(&self, node: &Spanned<Expr>) -> Result<EvalValue> {
        match &node.inner {
            Expr::Literal(literal) => Ok(literal.into()),
            Expr::Column(name) => self
                .row
                .value(name)
                .cloned()
                .ok_or_else(|| CohortError::evaluation(COH0202, format!("no value for column '{name}'"))),
            Expr::Not(inner) => {
                let value = self.eval(inner)?;
                Ok(value.truthiness().map_or(EvalValue::Null, |b| EvalValue::Bool(!b)))
            }
            Expr::Binary(binary) => {
                let left = self.eval(&binary.left)?;
                let right = self.eval(&binary.right)?;
                match binary.op {
                    BinaryOp::And => Ok(and(left.truthiness(), right.truthiness())),
                    BinaryOp::Or => Ok(or(left.truthiness(), right.truthiness())),
                    op => compare(op, &left, &right),
                }
            }
        }
    }
}

fn logic(value: Option<bool>) -> EvalValue {
    value.map_or(EvalValue::Null, EvalValue::Bool)
}

fn and(left: Option<bool>, right: Option<bool>) -> EvalValue {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => EvalValue::Bool(false),
        (Some(true), Some(true)) => EvalValue::Bool(true),
        _ => EvalValue::Null,
    }
}

fn or(left: Option<bool>, right: Option<bool>) -> EvalValue {
    match (left, right) {
        (Some(true), _) | (_, Some(true)) => EvalValue::Bool(true),
        (Some(false), Some(false)) => EvalValue::Bool(false),
        _ => EvalValue::Null,
    }
}

/// Order two non-null values
///
/// Booleans compare as 1/0 against numbers; dates compare against ISO strings.
fn order(left: &EvalValue, right: &EvalValue) -> Option<Ordering> {
    use EvalValue as V;
    match (left, right) {
        (V::Str(a), V::Str(b)) => Some(a.cmp(b)),
        (V::Date(_), _) | (_, V::Date(_)) => Some(left.as_date()?.cmp(&right.as_date()?)),
        (V::Int(a), V::Int(b)) => Some(a.cmp(b)),
        _ => left.as_number()?.partial_cmp(&right.as_number()?),
    }
}

fn compare(op: BinaryOp, left: &EvalValue, right: &EvalValue) -> Result<EvalValue> {
    if left.is_null() || right.is_null() {
        return Ok(EvalValue::Null);
    }
    let ordering = order(left, right).ok_or_else(|| {
        CohortError::evaluation(
            COH0201,
            format!(
                "cannot compare {} {} with {} {}",
                left.type_name(),
                left,
                right.type_name(),
                right
            ),
        )
    })?;
    let result = match op {
        BinaryOp::Equal => ordering == Ordering::Equal,
        BinaryOp::NotEqual => ordering != Ordering::Equal,
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::LessOrEqual => ordering != Ordering::Greater,
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::GreaterOrEqual => ordering != Ordering::Less,
        BinaryOp::And | BinaryOp::Or => {
            return Err(CohortError::evaluation(
                COH0200,
                format!("{} is not a comparison", op.symbol()),
            ));
        }
    };
    Ok(logic(Some(result)))
}
