//! Cohort specification error types

use crate::{
    COH0001, COH0002, COH0003, COH0004, COH0005, COH0006, COH0007, COH0008, COH0010, COH0011,
    COH0012, ErrorCode, Span,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Error - the specification cannot be handed to a compiler
    Error,
    /// Warning - the specification is usable but has a gap
    Warning,
    /// Information - informational message
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message attached to a cohort column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Column the diagnostic refers to
    pub column: Option<String>,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            column: None,
            help: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            column: None,
            help: None,
        }
    }

    /// Set the column
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render with terminal colors
    #[cfg(feature = "colored")]
    pub fn render_colored(&self) -> String {
        use colored::Colorize;

        let severity = match self.severity {
            Severity::Error => self.severity.to_string().red().bold(),
            Severity::Warning => self.severity.to_string().yellow().bold(),
            Severity::Info => self.severity.to_string().blue().bold(),
        };
        let mut out = format!("{}[{}]: {}", severity, self.code, self.message);
        if let Some(column) = &self.column {
            out.push_str(&format!("\n  {} column `{}`", "-->".blue(), column));
        }
        if let Some(help) = self.help.as_deref().or(self.code.info().help) {
            out.push_str(&format!("\n  {} {}", "help:".green(), help));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(column) = &self.column {
            write!(f, " (column '{}')", column)?;
        }
        Ok(())
    }
}

/// Main cohort specification error type
#[derive(Debug, Clone, Error)]
pub enum CohortError {
    /// Operation name outside the fixed vocabulary
    #[error("{}: unknown operation '{name}'", COH0001)]
    UnknownOperation { name: String },

    /// `between` combined with a discrete date bound
    #[error("{}: {operation} accepts either `between` or `on_or_before`/`on_or_after`, not both", COH0002)]
    ConflictingDateBounds { operation: String },

    /// Contradictory matching rules or deprecated aliases
    #[error("{}: {operation}: {message}", COH0003)]
    AmbiguousMatchingRule { operation: String, message: String },

    /// Code list bound to the wrong coding system
    #[error("{}: {operation} requires a '{expected}' codelist, got '{found}'", COH0004)]
    InvalidCodeSystem {
        operation: String,
        expected: String,
        found: String,
    },

    /// Pathogen not covered by the data source
    #[error("{}: unsupported pathogen {}", COH0005, .pathogen.as_deref().map(|p| format!("'{p}'")).unwrap_or_else(|| "(none given)".to_string()))]
    UnsupportedPathogen {
        pathogen: Option<String>,
        supported: Vec<String>,
    },

    /// Expectations omitted where conventionally required
    #[error("{}: column '{column}' ({operation}) has no return_expectations", COH0006)]
    MissingRequiredExpectations { column: String, operation: String },

    /// A single-instance return shape without a matching rule
    #[error("{}: {operation} returning {returning} needs a matching rule", COH0007)]
    MissingMatchingRule { operation: String, returning: String },

    /// Argument value outside its accepted domain
    #[error("{code}: {operation}: invalid `{argument}`: {message}")]
    InvalidArgument {
        code: ErrorCode,
        operation: String,
        argument: String,
        message: String,
    },

    /// Column name defined twice
    #[error("{}: column '{column}' is already defined", COH0010)]
    DuplicateColumn { column: String },

    /// Reference to a column not (yet) defined
    #[error("{}: column '{column}' refers to undefined column '{reference}'", COH0011)]
    UndefinedColumn { column: String, reference: String },

    /// Malformed category definition mapping
    #[error("{}: {message}", COH0012)]
    InvalidCategoryDefinitions { message: String },

    /// Category expression syntax or reference error
    #[error("{code}: {message} in expression '{expression}'")]
    Expression {
        code: ErrorCode,
        message: String,
        expression: String,
        span: Option<Span>,
    },

    /// Reference evaluator error
    #[error("{code}: {message}")]
    Evaluation { code: ErrorCode, message: String },

    /// Study definition loading error
    #[error("{code}: {message}")]
    Load {
        code: ErrorCode,
        message: String,
        context: Option<String>,
    },

    /// System error (I/O, configuration, backend)
    #[error("{code}: {message}")]
    System { code: ErrorCode, message: String },

    /// Error raised while defining a named column
    #[error("column '{column}': {source}")]
    Column {
        column: String,
        #[source]
        source: Box<CohortError>,
    },

    /// Multiple errors collected
    #[error("Multiple errors: {}", .0.len())]
    Multiple(Vec<CohortError>),
}

impl CohortError {
    /// Create an unknown operation error
    pub fn unknown_operation(name: impl Into<String>) -> Self {
        Self::UnknownOperation { name: name.into() }
    }

    /// Create a conflicting date bounds error
    pub fn conflicting_date_bounds(operation: impl Into<String>) -> Self {
        Self::ConflictingDateBounds {
            operation: operation.into(),
        }
    }

    /// Create an ambiguous matching rule error
    pub fn ambiguous_matching_rule(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AmbiguousMatchingRule {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an invalid code system error
    pub fn invalid_code_system(
        operation: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::InvalidCodeSystem {
            operation: operation.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an unsupported pathogen error
    pub fn unsupported_pathogen(pathogen: Option<&str>, supported: Vec<String>) -> Self {
        Self::UnsupportedPathogen {
            pathogen: pathogen.map(str::to_string),
            supported,
        }
    }

    /// Create a missing expectations error
    pub fn missing_expectations(column: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::MissingRequiredExpectations {
            column: column.into(),
            operation: operation.into(),
        }
    }

    /// Create a missing matching rule error
    pub fn missing_matching_rule(operation: impl Into<String>, returning: impl Into<String>) -> Self {
        Self::MissingMatchingRule {
            operation: operation.into(),
            returning: returning.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(
        operation: impl Into<String>,
        argument: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            code: COH0008,
            operation: operation.into(),
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error with a more specific code
    pub fn invalid_argument_with_code(
        code: ErrorCode,
        operation: impl Into<String>,
        argument: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            code,
            operation: operation.into(),
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate column error
    pub fn duplicate_column(column: impl Into<String>) -> Self {
        Self::DuplicateColumn {
            column: column.into(),
        }
    }

    /// Create an undefined column error
    pub fn undefined_column(column: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::UndefinedColumn {
            column: column.into(),
            reference: reference.into(),
        }
    }

    /// Create an invalid category definitions error
    pub fn invalid_categories(message: impl Into<String>) -> Self {
        Self::InvalidCategoryDefinitions {
            message: message.into(),
        }
    }

    /// Create an expression error
    pub fn expression(
        code: ErrorCode,
        message: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self::Expression {
            code,
            message: message.into(),
            expression: expression.into(),
            span: None,
        }
    }

    /// Create an expression error pointing at a span
    pub fn expression_at(
        code: ErrorCode,
        message: impl Into<String>,
        expression: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::Expression {
            code,
            message: message.into(),
            expression: expression.into(),
            span: Some(span),
        }
    }

    /// Create an evaluation error
    pub fn evaluation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Evaluation {
            code,
            message: message.into(),
        }
    }

    /// Create a loading error
    pub fn load(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Load {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Create a system error
    pub fn system(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::System {
            code,
            message: message.into(),
        }
    }

    /// Attach the name of the column being defined
    pub fn in_column(self, column: impl Into<String>) -> Self {
        match self {
            // Already attributed
            Self::Column { .. } => self,
            other => Self::Column {
                column: column.into(),
                source: Box::new(other),
            },
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownOperation { .. } => COH0001,
            Self::ConflictingDateBounds { .. } => COH0002,
            Self::AmbiguousMatchingRule { .. } => COH0003,
            Self::InvalidCodeSystem { .. } => COH0004,
            Self::UnsupportedPathogen { .. } => COH0005,
            Self::MissingRequiredExpectations { .. } => COH0006,
            Self::MissingMatchingRule { .. } => COH0007,
            Self::InvalidArgument { code, .. } => *code,
            Self::DuplicateColumn { .. } => COH0010,
            Self::UndefinedColumn { .. } => COH0011,
            Self::InvalidCategoryDefinitions { .. } => COH0012,
            Self::Expression { code, .. } => *code,
            Self::Evaluation { code, .. } => *code,
            Self::Load { code, .. } => *code,
            Self::System { code, .. } => *code,
            Self::Column { source, .. } => source.code(),
            Self::Multiple(errors) => errors.first().map(|e| e.code()).unwrap_or(ErrorCode::new(0)),
        }
    }

    /// Strip any column attribution and return the underlying error
    pub fn root(&self) -> &CohortError {
        match self {
            Self::Column { source, .. } => source.root(),
            other => other,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Column { column, source } => source.to_diagnostic().with_column(column.clone()),
            Self::Load {
                code,
                message,
                context: Some(ctx),
            } => Diagnostic::error(*code, message.clone()).with_help(ctx.clone()),
            Self::UnsupportedPathogen { supported, .. } => {
                Diagnostic::error(self.code(), self.to_string())
                    .with_help(format!("supported pathogens: {}", supported.join(", ")))
            }
            Self::Expression {
                code,
                expression,
                span: Some(span),
                ..
            } => {
                let help = match span.slice(expression) {
                    Some(fragment) if !fragment.is_empty() => format!("at {span}: '{fragment}'"),
                    _ => format!("at {span}"),
                };
                Diagnostic::error(*code, self.to_string()).with_help(help)
            }
            Self::Multiple(errors) => match errors.first() {
                Some(first) => first.to_diagnostic(),
                None => Diagnostic::error(ErrorCode::new(0), "Unknown error"),
            },
            other => Diagnostic::error(other.code(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::COH0101;

    #[test]
    fn test_column_attribution() {
        let err = CohortError::conflicting_date_bounds("with_gp_consultations").in_column("gp");
        assert_eq!(err.code(), COH0002);
        assert!(matches!(err.root(), CohortError::ConflictingDateBounds { .. }));

        let diag = err.to_diagnostic();
        assert_eq!(diag.column.as_deref(), Some("gp"));
        assert_eq!(diag.severity, Severity::Error);
    }

    #[test]
    fn test_column_attribution_is_not_nested() {
        let err = CohortError::duplicate_column("age").in_column("age").in_column("other");
        match err {
            CohortError::Column { column, .. } => assert_eq!(column, "age"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_expression_error_display() {
        let err = CohortError::expression_at(COH0101, "Unexpected end", "age >", Span::new(5, 5));
        assert!(err.to_string().contains("COH0101"));
        assert!(err.to_string().contains("age >"));
    }

    #[test]
    fn test_expression_diagnostic_points_at_span() {
        let err = CohortError::expression_at(COH0101, "Unknown column", "age > 65 and bmi", Span::new(13, 16));
        assert_eq!(err.to_diagnostic().help.as_deref(), Some("at 13..16: 'bmi'"));

        let err = CohortError::expression_at(COH0101, "Unexpected end", "age >", Span::point(5));
        assert_eq!(err.to_diagnostic().help.as_deref(), Some("at 5..5"));

        let err = CohortError::expression(COH0101, "Unexpected end", "age >");
        assert!(err.to_diagnostic().help.is_none());
    }

    #[test]
    fn test_unsupported_pathogen_display() {
        let err = CohortError::unsupported_pathogen(None, vec!["SARS-CoV-2".into()]);
        assert!(err.to_string().contains("(none given)"));
        assert!(err.to_diagnostic().help.unwrap().contains("SARS-CoV-2"));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warning(COH0006, "no expectations").with_column("bmi");
        assert!(diag.to_string().contains("COH0006"));
        assert!(diag.to_string().contains("bmi"));
    }
}
