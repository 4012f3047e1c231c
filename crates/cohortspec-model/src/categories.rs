//! Category definitions for `categorised_as` columns

use cohortspec_ast::Expression;
use cohortspec_diagnostics::{CohortError, Result};
use serde::de::{self, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Sentinel marking the fallback category
pub const DEFAULT_SENTINEL: &str = "DEFAULT";

/// A category label: usually a small integer, sometimes a code string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryLabel {
    Int(i64),
    Str(String),
}

impl CategoryLabel {
    /// Interpret a mapping key; keys that read as integers become `Int`
    pub fn from_key(key: &str) -> Self {
        match key.trim().parse::<i64>() {
            Ok(i) => Self::Int(i),
            Err(_) => Self::Str(key.to_string()),
        }
    }
}

impl From<i64> for CategoryLabel {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for CategoryLabel {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for CategoryLabel {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for CategoryLabel {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for CategoryLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for CategoryLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct LabelVisitor;

        impl Visitor<'_> for LabelVisitor {
            type Value = CategoryLabel;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer or string category label")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
                Ok(CategoryLabel::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
                i64::try_from(v)
                    .map(CategoryLabel::Int)
                    .map_err(|_| E::custom("category label out of range"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                Ok(CategoryLabel::from_key(v))
            }
        }

        deserializer.deserialize_any(LabelVisitor)
    }
}

/// What a category entry matches on
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryRule {
    /// A boolean expression over other columns
    Expression(Expression),
    /// Unconditional fallback
    Default,
}

impl CategoryRule {
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

/// Ordered category definitions with exactly one `DEFAULT` entry
///
/// Declaration order is evaluation order. The `DEFAULT` entry is only ever
/// used as the fallback, wherever it appears in the list.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDefinitions {
    entries: Vec<(CategoryLabel, CategoryRule)>,
    default_index: usize,
}

impl CategoryDefinitions {
    /// Parse `(label, expression-or-DEFAULT)` pairs
    pub fn parse<L, S>(definitions: impl IntoIterator<Item = (L, S)>) -> Result<Self>
    where
        L: Into<CategoryLabel>,
        S: AsRef<str>,
    {
        let mut entries: Vec<(CategoryLabel, CategoryRule)> = Vec::new();
        for (label, source) in definitions {
            let label = label.into();
            if entries.iter().any(|(existing, _)| *existing == label) {
                return Err(CohortError::invalid_categories(format!(
                    "category {label} is defined more than once"
                )));
            }
            let source = source.as_ref();
            let rule = if source.trim() == DEFAULT_SENTINEL {
                CategoryRule::Default
            } else {
                CategoryRule::Expression(cohortspec_parser::parse_expression(source)?)
            };
            entries.push((label, rule));
        }

        let defaults: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, (_, rule))| rule.is_default())
            .map(|(i, _)| i)
            .collect();
        match defaults.as_slice() {
            [default_index] => Ok(Self {
                default_index: *default_index,
                entries,
            }),
            [] => Err(CohortError::invalid_categories(
                "category definitions need a \"DEFAULT\" entry",
            )),
            many => Err(CohortError::invalid_categories(format!(
                "category definitions have {} \"DEFAULT\" entries, expected exactly one",
                many.len()
            ))),
        }
    }

    /// All entries in declaration order, including `DEFAULT`
    pub fn entries(&self) -> &[(CategoryLabel, CategoryRule)] {
        &self.entries
    }

    /// Expression entries in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = (&CategoryLabel, &Expression)> {
        self.entries.iter().filter_map(|(label, rule)| match rule {
            CategoryRule::Expression(expr) => Some((label, expr)),
            CategoryRule::Default => None,
        })
    }

    /// Label of the `DEFAULT` entry
    pub fn default_label(&self) -> &CategoryLabel {
        &self.entries[self.default_index].0
    }

    /// Column names referenced by any expression, in first-appearance order
    pub fn columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for (_, expr) in self.rules() {
            for column in expr.columns() {
                if !out.contains(&column) {
                    out.push(column);
                }
            }
        }
        out
    }

    pub fn labels(&self) -> impl Iterator<Item = &CategoryLabel> {
        self.entries.iter().map(|(label, _)| label)
    }
}

impl Serialize for CategoryDefinitions {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, rule) in &self.entries {
            match rule {
                CategoryRule::Expression(expr) => map.serialize_entry(label, &expr.source)?,
                CategoryRule::Default => map.serialize_entry(label, DEFAULT_SENTINEL)?,
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohortspec_diagnostics::COH0012;

    #[test]
    fn test_parse_keeps_declaration_order() {
        let defs = CategoryDefinitions::parse([(0, "DEFAULT"), (2, "age > 80"), (1, "age > 65")]).unwrap();
        let labels: Vec<_> = defs.labels().cloned().collect();
        assert_eq!(labels, vec![CategoryLabel::Int(0), CategoryLabel::Int(2), CategoryLabel::Int(1)]);
        let rule_labels: Vec<_> = defs.rules().map(|(l, _)| l.clone()).collect();
        assert_eq!(rule_labels, vec![CategoryLabel::Int(2), CategoryLabel::Int(1)]);
        assert_eq!(defs.default_label(), &CategoryLabel::Int(0));
    }

    #[test]
    fn test_exactly_one_default() {
        let err = CategoryDefinitions::parse([(1, "a"), (0, "b")]).unwrap_err();
        assert_eq!(err.code(), COH0012);
        let err = CategoryDefinitions::parse([(1, "DEFAULT"), (0, "DEFAULT")]).unwrap_err();
        assert_eq!(err.code(), COH0012);
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let err = CategoryDefinitions::parse([("M", "sex = 'M'"), ("M", "DEFAULT")]).unwrap_err();
        assert_eq!(err.code(), COH0012);
    }

    #[test]
    fn test_columns_across_rules() {
        let defs = CategoryDefinitions::parse([
            (1, "age > 65 AND has_copd"),
            (2, "has_asthma OR age > 80"),
            (0, "DEFAULT"),
        ])
        .unwrap();
        assert_eq!(defs.columns(), vec!["age", "has_copd", "has_asthma"]);
    }

    #[test]
    fn test_label_from_key() {
        assert_eq!(CategoryLabel::from_key("12"), CategoryLabel::Int(12));
        assert_eq!(CategoryLabel::from_key("E"), CategoryLabel::Str("E".into()));
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let defs = CategoryDefinitions::parse([(1, "x = 1"), (0, "DEFAULT")]).unwrap();
        let json = serde_json::to_string(&defs).unwrap();
        assert_eq!(json, r#"{"1":"x = 1","0":"DEFAULT"}"#);
    }
}
