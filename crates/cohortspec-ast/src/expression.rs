//! Expression AST nodes for category expressions

use crate::{BinaryOp, BoxExpr, Literal, Spanned};
use std::fmt;

/// All category expression kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal(Literal),
    /// Reference to another column by name
    Column(String),
    /// Logical negation
    Not(BoxExpr),
    /// Binary operation
    Binary(BinaryExpr),
}

/// Binary operation node
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: BoxExpr,
    pub op: BinaryOp,
    pub right: BoxExpr,
}

impl Expr {
    /// Create a column reference
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// Collect referenced column names in first-appearance order
    pub fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Not(inner) => inner.inner.collect_columns(out),
            Self::Binary(b) => {
                b.left.inner.collect_columns(out);
                b.right.inner.collect_columns(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Column(name) => write!(f, "{name}"),
            Self::Not(inner) => match &inner.inner {
                Self::Binary(_) => write!(f, "NOT ({})", inner.inner),
                other => write!(f, "NOT {other}"),
            },
            Self::Binary(b) => {
                write_operand(f, &b.left.inner, b.op)?;
                write!(f, " {} ", b.op.symbol())?;
                write_operand(f, &b.right.inner, b.op)
            }
        }
    }
}

/// Parenthesize operands that bind looser than their parent
fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expr, parent: BinaryOp) -> fmt::Result {
    match operand {
        Expr::Binary(child) if child.op.precedence() <= parent.precedence() && child.op != parent => {
            write!(f, "({operand})")
        }
        Expr::Binary(child) if parent.is_comparison() && child.op.is_comparison() => {
            write!(f, "({operand})")
        }
        _ => write!(f, "{operand}"),
    }
}

/// A parsed category expression together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// Original expression text, as written by the researcher
    pub source: String,
    /// Root of the parsed tree
    pub root: Spanned<Expr>,
}

impl Expression {
    pub fn new(source: impl Into<String>, root: Spanned<Expr>) -> Self {
        Self {
            source: source.into(),
            root,
        }
    }

    /// Column names referenced by the expression, in first-appearance order
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.inner.collect_columns(&mut out);
        out
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohortspec_diagnostics::Span;

    fn sp(expr: Expr) -> BoxExpr {
        Box::new(Spanned::new(expr, Span::default()))
    }

    fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
        Expr::Binary(BinaryExpr {
            left: sp(left),
            op,
            right: sp(right),
        })
    }

    #[test]
    fn test_columns_deduplicated_in_order() {
        let expr = binary(
            binary(Expr::column("b"), BinaryOp::Greater, Expr::Literal(Literal::Integer(1))),
            BinaryOp::And,
            binary(Expr::column("a"), BinaryOp::Or, Expr::column("b")),
        );
        let mut out = Vec::new();
        expr.collect_columns(&mut out);
        assert_eq!(out, vec!["b", "a"]);
    }

    #[test]
    fn test_display_parenthesizes_looser_operands() {
        let expr = binary(
            binary(Expr::column("a"), BinaryOp::Or, Expr::column("b")),
            BinaryOp::And,
            Expr::Not(sp(Expr::column("c"))),
        );
        assert_eq!(expr.to_string(), "(a OR b) AND NOT c");
    }

    #[test]
    fn test_display_string_literal_escapes_quotes() {
        let expr = binary(
            Expr::column("name"),
            BinaryOp::Equal,
            Expr::Literal(Literal::String("O'Brien".into())),
        );
        assert_eq!(expr.to_string(), "name = 'O''Brien'");
    }
}
