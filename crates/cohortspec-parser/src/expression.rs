//! Expression parser using recursive descent with precedence climbing

use crate::combinators::{comparison_op, is_keyword, keyword, number, string, symbol, word, ws, Input, PResult};
use cohortspec_ast::{BinaryExpr, BinaryOp, Expr, Expression, Literal, Spanned};
use cohortspec_diagnostics::{CohortError, Result, Span, COH0100, COH0101, COH0102};
use winnow::error::{ContextError, ErrMode};

/// Parse a single category expression
pub fn parse_expression(source: &str) -> Result<Expression> {
    let parser = ExprParser { source };
    let mut input: Input<'_> = source;

    let root = parser.or_expression(&mut input).map_err(|_| parser.error_at(input))?;
    ws(&mut input).ok();
    if !input.is_empty() {
        return Err(parser.error_at(input));
    }
    Ok(Expression::new(source, root))
}

fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

/// Holds the full source so node spans can be computed from the remaining input
struct ExprParser<'s> {
    source: &'s str,
}

impl<'s> ExprParser<'s> {
    fn offset(&self, input: &Input<'s>) -> usize {
        self.source.len() - input.len()
    }

    fn spanned(&self, expr: Expr, start: usize, input: &Input<'s>) -> Spanned<Expr> {
        Spanned::new(expr, Span::new(start, self.offset(input)))
    }

    /// Build the user-facing error for a failure at the remaining input
    fn error_at(&self, remaining: Input<'s>) -> CohortError {
        let rest = remaining.trim_start();
        let pos = self.source.len() - rest.len();
        let span = Span::point(pos);
        if rest.is_empty() {
            CohortError::expression_at(COH0101, "Unexpected end of expression", self.source, span)
        } else if rest.starts_with('\'') || rest.starts_with('"') {
            CohortError::expression_at(COH0102, "Unterminated string literal", self.source, span)
        } else {
            let token: String = rest.chars().take_while(|c| !c.is_whitespace()).collect();
            CohortError::expression_at(
                COH0100,
                format!("Unexpected '{}' at offset {}", token, pos),
                self.source,
                span,
            )
        }
    }

    fn binary(&self, left: Spanned<Expr>, op: BinaryOp, right: Spanned<Expr>) -> Spanned<Expr> {
        let span = left.span.merge(right.span);
        Spanned::new(
            Expr::Binary(BinaryExpr {
                left: Box::new(left),
                op,
                right: Box::new(right),
            }),
            span,
        )
    }

    /// Parse or expression (lowest precedence)
    fn or_expression(&self, input: &mut Input<'s>) -> PResult<Spanned<Expr>> {
        let mut left = self.and_expression(input)?;
        loop {
            ws(input)?;
            if keyword(input, "or") {
                let right = self.and_expression(input)?;
                left = self.binary(left, BinaryOp::Or, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    /// Parse and expression
    fn and_expression(&self, input: &mut Input<'s>) -> PResult<Spanned<Expr>> {
        let mut left = self.not_expression(input)?;
        loop {
            ws(input)?;
            if keyword(input, "and") {
                let right = self.not_expression(input)?;
                left = self.binary(left, BinaryOp::And, right);
            } else {
                break;
            }
        }
        Ok(left)
    }

    /// Parse prefix NOT
    fn not_expression(&self, input: &mut Input<'s>) -> PResult<Spanned<Expr>> {
        ws(input)?;
        let start = self.offset(input);
        if keyword(input, "not") {
            let operand = self.not_expression(input)?;
            return Ok(self.spanned(Expr::Not(Box::new(operand)), start, input));
        }
        self.comparison_expression(input)
    }

    /// Parse a single, non-associative comparison
    fn comparison_expression(&self, input: &mut Input<'s>) -> PResult<Spanned<Expr>> {
        let left = self.primary(input)?;
        ws(input)?;
        let checkpoint = *input;
        match comparison_op(input) {
            Ok(op) => {
                let right = self.primary(input)?;
                Ok(self.binary(left, op, right))
            }
            Err(_) => {
                *input = checkpoint;
                Ok(left)
            }
        }
    }

    /// Parse literals, column references and parenthesized expressions
    fn primary(&self, input: &mut Input<'s>) -> PResult<Spanned<Expr>> {
        ws(input)?;
        let start = self.offset(input);

        if input.starts_with('(') {
            symbol(input, "(")?;
            let inner = self.or_expression(input)?;
            ws(input)?;
            symbol(input, ")")?;
            // Widen the span to include the parentheses
            return Ok(Spanned::new(inner.inner, Span::new(start, self.offset(input))));
        }

        if input.starts_with('\'') || input.starts_with('"') {
            let checkpoint = *input;
            return match string(input) {
                Ok(s) => Ok(self.spanned(Expr::Literal(Literal::String(s)), start, input)),
                Err(e) => {
                    // report from the opening quote
                    *input = checkpoint;
                    Err(e)
                }
            };
        }

        if input.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
            let lit = number(input)?;
            return Ok(self.spanned(Expr::Literal(lit), start, input));
        }

        let checkpoint = *input;
        let name = word(input)?;
        let expr = match name.to_ascii_lowercase().as_str() {
            "true" => Expr::Literal(Literal::Boolean(true)),
            "false" => Expr::Literal(Literal::Boolean(false)),
            "null" => Expr::Literal(Literal::Null),
            _ if is_keyword(name) => {
                *input = checkpoint;
                return Err(backtrack());
            }
            _ => Expr::Column(name.to_string()),
        };
        Ok(self.spanned(expr, start, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse_expression("age > 65").unwrap();
        match &expr.root.inner {
            Expr::Binary(b) => {
                assert_eq!(b.op, BinaryOp::Greater);
                assert_eq!(b.left.inner, Expr::column("age"));
                assert_eq!(b.right.inner, Expr::Literal(Literal::Integer(65)));
            }
            other => panic!("expected binary, got {other:?}"),
        }
        assert_eq!(expr.root.span, Span::new(0, 8));
    }

    #[test]
    fn test_error_position_for_dangling_operator() {
        let err = parse_expression("age >").unwrap_err();
        assert_eq!(err.code(), COH0101);
    }

    #[test]
    fn test_error_for_trailing_tokens() {
        let err = parse_expression("age > 65 65").unwrap_err();
        assert_eq!(err.code(), COH0100);
        match err {
            CohortError::Expression { span, .. } => assert_eq!(span, Some(Span::point(9))),
            other => panic!("unexpected {other:?}"),
        }
    }
}
