//! Token-level parsers for category expressions

use cohortspec_ast::{BinaryOp, Literal};
use winnow::ModalResult;
use winnow::ascii::{digit1, multispace0};
use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::{literal, one_of, take_till, take_while};

/// Parser input
pub type Input<'a> = &'a str;

/// Parser result
pub type PResult<O> = ModalResult<O>;

/// Skip whitespace
pub fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.void().parse_next(input)
}

/// Parse a bare word: a letter or `_` followed by letters, digits or `_`
pub fn word<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Check if a word is a reserved keyword
pub fn is_keyword(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "and" | "or" | "not" | "true" | "false" | "null"
    )
}

/// Try to consume a keyword, restoring the input when it is not there
pub fn keyword(input: &mut Input<'_>, kw: &str) -> bool {
    let checkpoint = *input;
    match word(input) {
        Ok(w) if w.eq_ignore_ascii_case(kw) => true,
        _ => {
            *input = checkpoint;
            false
        }
    }
}

/// Parse a fixed symbol
pub fn symbol<'a>(input: &mut Input<'a>, sym: &'static str) -> PResult<&'a str> {
    literal(sym).parse_next(input)
}

/// Parse a number: integer or decimal, optionally negative
fn number_text<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (opt('-'), digit1, opt(('.', digit1))).take().parse_next(input)
}

/// Parse a numeric literal
pub fn number(input: &mut Input<'_>) -> PResult<Literal> {
    let text = number_text(input)?;
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Literal::Integer(i));
        }
    }
    // digits with at most one dot always parse as a float
    Ok(Literal::Float(text.parse::<f64>().unwrap_or(f64::NAN)))
}

fn open_quote(input: &mut Input<'_>) -> PResult<char> {
    one_of(['\'', '"']).parse_next(input)
}

fn until_quote<'a>(input: &mut Input<'a>, quote: char) -> PResult<&'a str> {
    take_till(0.., quote).parse_next(input)
}

fn close_quote(input: &mut Input<'_>, mut quote: char) -> PResult<char> {
    quote.parse_next(input)
}

/// Parse a quoted string; a doubled quote character escapes itself
pub fn string(input: &mut Input<'_>) -> PResult<String> {
    let quote = open_quote(input)?;
    let mut out = String::new();
    loop {
        out.push_str(until_quote(input, quote)?);
        close_quote(input, quote)?;
        if input.starts_with(quote) {
            close_quote(input, quote)?;
            out.push(quote);
        } else {
            return Ok(out);
        }
    }
}

/// Parse a comparison operator
pub fn comparison_op(input: &mut Input<'_>) -> PResult<BinaryOp> {
    alt((
        "==".value(BinaryOp::Equal),
        "!=".value(BinaryOp::NotEqual),
        "<>".value(BinaryOp::NotEqual),
        "<=".value(BinaryOp::LessOrEqual),
        ">=".value(BinaryOp::GreaterOrEqual),
        "=".value(BinaryOp::Equal),
        "<".value(BinaryOp::Less),
        ">".value(BinaryOp::Greater),
    ))
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word() {
        let mut input = "has_asthma2 AND x";
        assert_eq!(word(&mut input).unwrap(), "has_asthma2");
        assert_eq!(input, " AND x");
    }

    #[test]
    fn test_keyword_restores_input() {
        let mut input = "android";
        assert!(!keyword(&mut input, "and"));
        assert_eq!(input, "android");
        assert!(keyword(&mut input, "android"));
        assert_eq!(input, "");
    }

    #[test]
    fn test_number() {
        let mut input = "-12";
        assert_eq!(number(&mut input).unwrap(), Literal::Integer(-12));
        let mut input = "2.5 ";
        assert_eq!(number(&mut input).unwrap(), Literal::Float(2.5));
        assert_eq!(input, " ");
    }

    #[test]
    fn test_string_escape() {
        let mut input = "'O''Brien' rest";
        assert_eq!(string(&mut input).unwrap(), "O'Brien");
        assert_eq!(input, " rest");
        let mut input = "\"M\"";
        assert_eq!(string(&mut input).unwrap(), "M");
    }

    #[test]
    fn test_unterminated_string_fails() {
        let mut input = "'abc";
        assert!(string(&mut input).is_err());
    }

    #[test]
    fn test_comparison_op_longest_match() {
        let mut input = "<= 3";
        assert_eq!(comparison_op(&mut input).unwrap(), BinaryOp::LessOrEqual);
        let mut input = "== 3";
        assert_eq!(comparison_op(&mut input).unwrap(), BinaryOp::Equal);
        let mut input = "<> 3";
        assert_eq!(comparison_op(&mut input).unwrap(), BinaryOp::NotEqual);
    }
}
