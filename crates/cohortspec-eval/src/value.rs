//! Column values seen by the reference evaluators

use chrono::NaiveDate;
use cohortspec_ast::Literal;
use cohortspec_model::CategoryLabel;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// Runtime value of one column for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvalValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Date value
    Date(NaiveDate),
    /// String value
    Str(String),
}

impl EvalValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truth value of a bare column reference
    ///
    /// Numbers are true when non-zero, strings when non-empty, dates always;
    /// `NULL` is unknown.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Float(x) => Some(*x != 0.0),
            Self::Str(s) => Some(!s.is_empty()),
            Self::Date(_) => Some(true),
        }
    }

    /// Numeric view, booleans counting as 1 and 0
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Date view; ISO strings are accepted
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Str(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Date(_) => "date",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for EvalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::Str(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<&Literal> for EvalValue {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Self::Null,
            Literal::Boolean(b) => Self::Bool(*b),
            Literal::Integer(i) => Self::Int(*i),
            Literal::Float(x) => Self::Float(*x),
            Literal::String(s) => Self::Str(s.clone()),
        }
    }
}

impl From<bool> for EvalValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for EvalValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for EvalValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for EvalValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for EvalValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for EvalValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<NaiveDate> for EvalValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<&CategoryLabel> for EvalValue {
    fn from(label: &CategoryLabel) -> Self {
        match label {
            CategoryLabel::Int(i) => Self::Int(*i),
            CategoryLabel::Str(s) => Self::Str(s.clone()),
        }
    }
}

impl From<&JsonValue> for EvalValue {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            JsonValue::String(s) => Self::Str(s.clone()),
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => Self::Null,
        }
    }
}

/// A patient's column values
pub trait Columns {
    /// Value of `name`, or `None` if the row has no such column
    fn value(&self, name: &str) -> Option<&EvalValue>;
}

impl Columns for HashMap<String, EvalValue> {
    fn value(&self, name: &str) -> Option<&EvalValue> {
        self.get(name)
    }
}

impl Columns for IndexMap<String, EvalValue> {
    fn value(&self, name: &str) -> Option<&EvalValue> {
        self.get(name)
    }
}

impl<C: Columns + ?Sized> Columns for &C {
    fn value(&self, name: &str) -> Option<&EvalValue> {
        (**self).value(name)
    }
}

/// Build a row from `(column, value)` pairs
pub fn row<K, V>(values: impl IntoIterator<Item = (K, V)>) -> IndexMap<String, EvalValue>
where
    K: Into<String>,
    V: Into<EvalValue>,
{
    values.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
