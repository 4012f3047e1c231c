//! Return shapes, matching rules and other enumerated argument values

use serde::{Serialize, Serializer};
use std::fmt;

/// Value a column emits, as selected by the `returning` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Returning {
    BinaryFlag,
    Date,
    NumberOfMatchesInPeriod,
    NumberOfEpisodes,
    Code,
    Category,
    NumericValue,
    DateAdmitted,
    DateOfDeath,
    UnderlyingCauseOfDeath,
    PseudoId,
    StpCode,
    MsoaCode,
    Nuts1RegionName,
    IndexOfMultipleDeprivation,
    RuralUrbanClassification,
}

/// Coarse kind of a returned value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    Flag,
    Date,
    Count,
    Category,
    /// A single attribute of the matched record (code, value, identifier)
    Value,
}

impl Returning {
    pub const ALL: [Returning; 16] = [
        Self::BinaryFlag,
        Self::Date,
        Self::NumberOfMatchesInPeriod,
        Self::NumberOfEpisodes,
        Self::Code,
        Self::Category,
        Self::NumericValue,
        Self::DateAdmitted,
        Self::DateOfDeath,
        Self::UnderlyingCauseOfDeath,
        Self::PseudoId,
        Self::StpCode,
        Self::MsoaCode,
        Self::Nuts1RegionName,
        Self::IndexOfMultipleDeprivation,
        Self::RuralUrbanClassification,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BinaryFlag => "binary_flag",
            Self::Date => "date",
            Self::NumberOfMatchesInPeriod => "number_of_matches_in_period",
            Self::NumberOfEpisodes => "number_of_episodes",
            Self::Code => "code",
            Self::Category => "category",
            Self::NumericValue => "numeric_value",
            Self::DateAdmitted => "date_admitted",
            Self::DateOfDeath => "date_of_death",
            Self::UnderlyingCauseOfDeath => "underlying_cause_of_death",
            Self::PseudoId => "pseudo_id",
            Self::StpCode => "stp_code",
            Self::MsoaCode => "msoa_code",
            Self::Nuts1RegionName => "nuts1_region_name",
            Self::IndexOfMultipleDeprivation => "index_of_multiple_deprivation",
            Self::RuralUrbanClassification => "rural_urban_classification",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == text)
    }

    pub fn shape(&self) -> ReturnShape {
        match self {
            Self::BinaryFlag => ReturnShape::Flag,
            Self::Date | Self::DateAdmitted | Self::DateOfDeath => ReturnShape::Date,
            Self::NumberOfMatchesInPeriod | Self::NumberOfEpisodes => ReturnShape::Count,
            Self::Category => ReturnShape::Category,
            Self::Code
            | Self::NumericValue
            | Self::UnderlyingCauseOfDeath
            | Self::PseudoId
            | Self::StpCode
            | Self::MsoaCode
            | Self::Nuts1RegionName
            | Self::IndexOfMultipleDeprivation
            | Self::RuralUrbanClassification => ReturnShape::Value,
        }
    }

    /// Whether the value comes from one selected event rather than all of them
    pub fn is_single_instance(&self) -> bool {
        matches!(self.shape(), ReturnShape::Date | ReturnShape::Category | ReturnShape::Value)
    }
}

impl fmt::Display for Returning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Returning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Which qualifying event represents the column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchingRule {
    First,
    Last,
}

impl MatchingRule {
    /// Resolve the `find_first_match_in_period`/`find_last_match_in_period` pair
    pub fn from_flags(find_first: bool, find_last: bool) -> Option<Option<Self>> {
        match (find_first, find_last) {
            (true, true) => None,
            (true, false) => Some(Some(Self::First)),
            (false, true) => Some(Some(Self::Last)),
            (false, false) => Some(None),
        }
    }
}

/// Laboratory result filter for SGSS queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TestResult {
    Positive,
    Negative,
    #[default]
    Any,
}

impl TestResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Any => "any",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    pub fn admits(&self, positive: bool) -> bool {
        match self {
            Self::Positive => positive,
            Self::Negative => !positive,
            Self::Any => true,
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip_names() {
        for r in Returning::ALL {
            assert_eq!(Returning::parse(r.as_str()), Some(r));
        }
        assert_eq!(Returning::parse("first_date"), None);
    }

    #[test]
    fn test_single_instance_shapes() {
        assert!(Returning::Date.is_single_instance());
        assert!(Returning::Category.is_single_instance());
        assert!(!Returning::BinaryFlag.is_single_instance());
        assert!(!Returning::NumberOfEpisodes.is_single_instance());
    }

    #[test]
    fn test_matching_rule_flags() {
        assert_eq!(MatchingRule::from_flags(true, true), None);
        assert_eq!(MatchingRule::from_flags(false, true), Some(Some(MatchingRule::Last)));
        assert_eq!(MatchingRule::from_flags(false, false), Some(None));
    }
}
