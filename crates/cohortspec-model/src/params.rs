//! Serialized parameter values of query nodes

use crate::categories::CategoryDefinitions;
use crate::codelist::Codelist;
use crate::dates::{DateFormat, DateRef, DateWindow};
use crate::expectations::ReturnExpectations;
use crate::node::QueryNode;
use crate::returning::{Returning, TestResult};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// Value space of a node's `parameters` mapping
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(DateRef),
    StrList(Vec<String>),
    /// Reference to another column by name
    Column(String),
    Codelist(Arc<Codelist>),
    Window(DateWindow),
    Categories(CategoryDefinitions),
    Expectations(ReturnExpectations),
    Nodes(IndexMap<String, QueryNode>),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Date(d) => d.serialize(serializer),
            Self::StrList(items) => items.serialize(serializer),
            Self::Column(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("column", name)?;
                map.end()
            }
            Self::Codelist(list) => list.serialize(serializer),
            Self::Window(window) => window.serialize(serializer),
            Self::Categories(defs) => defs.serialize(serializer),
            Self::Expectations(e) => e.serialize(serializer),
            Self::Nodes(nodes) => nodes.serialize(serializer),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<DateRef> for ParamValue {
    fn from(value: DateRef) -> Self {
        Self::Date(value)
    }
}

impl From<DateWindow> for ParamValue {
    fn from(value: DateWindow) -> Self {
        Self::Window(value)
    }
}

impl From<Arc<Codelist>> for ParamValue {
    fn from(value: Arc<Codelist>) -> Self {
        Self::Codelist(value)
    }
}

impl From<CategoryDefinitions> for ParamValue {
    fn from(value: CategoryDefinitions) -> Self {
        Self::Categories(value)
    }
}

impl From<DateFormat> for ParamValue {
    fn from(value: DateFormat) -> Self {
        Self::Str(value.as_str().to_string())
    }
}

impl From<Returning> for ParamValue {
    fn from(value: Returning) -> Self {
        Self::Str(value.as_str().to_string())
    }
}

impl From<TestResult> for ParamValue {
    fn from(value: TestResult) -> Self {
        Self::Str(value.as_str().to_string())
    }
}

impl From<IndexMap<String, QueryNode>> for ParamValue {
    fn from(value: IndexMap<String, QueryNode>) -> Self {
        Self::Nodes(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<ReturnExpectations> for ParamValue {
    fn from(value: ReturnExpectations) -> Self {
        Self::Expectations(value)
    }
}
