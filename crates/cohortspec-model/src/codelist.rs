//! Code lists bound to a coding system

use crate::categories::CategoryLabel;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Coding system tag carried by a code list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum CodingSystem {
    Ctv3,
    Snomed,
    Icd10,
    Dmd,
    Other(String),
}

impl CodingSystem {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ctv3 => "ctv3",
            Self::Snomed => "snomed",
            Self::Icd10 => "icd10",
            Self::Dmd => "dmd",
            Self::Other(tag) => tag,
        }
    }
}

impl FromStr for CodingSystem {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "ctv3" => Self::Ctv3,
            "snomed" | "snomedct" => Self::Snomed,
            "icd10" => Self::Icd10,
            "dmd" => Self::Dmd,
            _ => Self::Other(s.to_string()),
        })
    }
}

impl From<String> for CodingSystem {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(system) => system,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for CodingSystem {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

impl fmt::Display for CodingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CodingSystem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single code, optionally carrying the category it maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: String,
    pub category: Option<CategoryLabel>,
}

/// A named set of codes from one coding system
///
/// Code lists are loaded once and shared by reference (`Arc<Codelist>`) between
/// the nodes that use them. Node parameters serialize a code list by identity,
/// never by content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codelist {
    pub id: String,
    pub system: CodingSystem,
    pub codes: Vec<CodeEntry>,
}

impl Codelist {
    /// Create an uncategorised code list
    pub fn new<S: Into<String>>(
        id: impl Into<String>,
        system: impl Into<CodingSystem>,
        codes: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            id: id.into(),
            system: system.into(),
            codes: codes
                .into_iter()
                .map(|code| CodeEntry {
                    code: code.into(),
                    category: None,
                })
                .collect(),
        }
    }

    /// Create a code list where every code maps to a category
    pub fn categorised<S: Into<String>, L: Into<CategoryLabel>>(
        id: impl Into<String>,
        system: impl Into<CodingSystem>,
        codes: impl IntoIterator<Item = (S, L)>,
    ) -> Self {
        Self {
            id: id.into(),
            system: system.into(),
            codes: codes
                .into_iter()
                .map(|(code, category)| CodeEntry {
                    code: code.into(),
                    category: Some(category.into()),
                })
                .collect(),
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.iter().any(|entry| entry.code == code)
    }

    /// Category of a code, if the list is categorised and contains it
    pub fn category_of(&self, code: &str) -> Option<&CategoryLabel> {
        self.codes
            .iter()
            .find(|entry| entry.code == code)
            .and_then(|entry| entry.category.as_ref())
    }

    /// True when every code carries a category
    pub fn has_categories(&self) -> bool {
        !self.codes.is_empty() && self.codes.iter().all(|entry| entry.category.is_some())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Serialize for Codelist {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Codelist", 2)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("system", &self.system)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_tags() {
        assert_eq!(CodingSystem::from("CTV3"), CodingSystem::Ctv3);
        assert_eq!(CodingSystem::from("snomedct"), CodingSystem::Snomed);
        assert_eq!(CodingSystem::from("read2").as_str(), "read2");
    }

    #[test]
    fn test_categorised_lookup() {
        let list = Codelist::categorised("ethnicity", "ctv3", [("XaJQs", 1), ("XaJRX", 2)]);
        assert!(list.has_categories());
        assert_eq!(list.category_of("XaJRX"), Some(&CategoryLabel::Int(2)));
        assert_eq!(list.category_of("nope"), None);

        let plain = Codelist::new("asthma", "ctv3", ["H33.."]);
        assert!(!plain.has_categories());
        assert!(plain.contains("H33.."));
    }

    #[test]
    fn test_serialized_by_identity() {
        let list = Codelist::new("asthma", CodingSystem::Snomed, ["195967001", "233678006"]);
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"{"id":"asthma","system":"snomed"}"#);
    }
}
