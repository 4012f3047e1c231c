//! Resolved query nodes
//!
//! A [`QueryNode`] is the immutable output of a builder: one variant per
//! canonical operation, each holding a fully resolved record. Every default
//! has been applied, every deprecated alias folded in and every date range
//! canonicalized, so a compiler never has to re-derive anything.

use crate::categories::CategoryDefinitions;
use crate::codelist::Codelist;
use crate::dates::{DateFormat, DateRef, DateWindow};
use crate::expectations::ReturnExpectations;
use crate::operation::Operation;
use crate::params::ParamValue;
use crate::returning::{MatchingRule, Returning, TestResult};
use indexmap::IndexMap;
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, LazyLock};

static EPISODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^series of events each <= (\d+) days apart$").expect("valid episode pattern")
});

/// Events no more than `max_gap_days` apart collapse into one episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EpisodeDefinition {
    pub max_gap_days: u32,
}

impl EpisodeDefinition {
    /// Parse `series of events each <= N days apart`
    pub fn parse(text: &str) -> Option<Self> {
        let captures = EPISODE_PATTERN.captures(text.trim())?;
        let max_gap_days = captures.get(1)?.as_str().parse().ok()?;
        Some(Self { max_gap_days })
    }
}

impl fmt::Display for EpisodeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "series of events each <= {} days apart", self.max_gap_days)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomSample {
    pub percent: f64,
    pub expectations: Option<ReturnExpectations>,
}

/// A node whose only argument is its expectations
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Demographic {
    pub expectations: Option<ReturnExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AsOfDate {
    pub reference_date: DateRef,
    pub expectations: Option<ReturnExpectations>,
}

/// A node over a required date range
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub window: DateWindow,
    pub expectations: Option<ReturnExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MostRecentBmi {
    pub window: DateWindow,
    pub minimum_age_at_measurement: u32,
    pub include_measurement_date: bool,
    pub date_format: DateFormat,
    pub expectations: Option<ReturnExpectations>,
}

/// Mean of the values recorded on the most recent day of measurement
#[derive(Debug, Clone, PartialEq)]
pub struct MeanRecordedValue {
    pub codelist: Arc<Codelist>,
    pub window: DateWindow,
    pub include_measurement_date: bool,
    pub date_format: DateFormat,
    pub expectations: Option<ReturnExpectations>,
}

/// Coded medication or clinical event matches
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub codelist: Arc<Codelist>,
    pub window: DateWindow,
    pub matching: Option<MatchingRule>,
    pub returning: Returning,
    pub include_date_of_match: bool,
    pub date_format: DateFormat,
    /// Days on which any of these codes occur are dropped before matching
    pub ignore_days_where: Option<Arc<Codelist>>,
    pub episode: Option<EpisodeDefinition>,
    pub expectations: Option<ReturnExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Categorised {
    pub definitions: CategoryDefinitions,
    /// Inline columns visible only to this node's expressions
    pub extra_columns: IndexMap<String, QueryNode>,
    pub expectations: Option<ReturnExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PracticeAsOf {
    pub date: DateRef,
    pub returning: Returning,
    pub expectations: Option<ReturnExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressAsOf {
    pub date: DateRef,
    pub returning: Returning,
    pub round_to_nearest: Option<u32>,
    pub expectations: Option<ReturnExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CareHomeStatus {
    pub date: DateRef,
    pub categories: CategoryDefinitions,
    pub expectations: Option<ReturnExpectations>,
}

/// Dated events without a code list (ICU admissions, GP consultations)
#[derive(Debug, Clone, PartialEq)]
pub struct DatedEvents {
    pub window: DateWindow,
    pub matching: Option<MatchingRule>,
    pub returning: Returning,
    pub date_format: DateFormat,
    pub expectations: Option<ReturnExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeathCertificate {
    pub codelist: Arc<Codelist>,
    pub window: DateWindow,
    pub match_only_underlying_cause: bool,
    pub returning: Returning,
    pub date_format: DateFormat,
    pub expectations: Option<ReturnExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Death {
    pub window: DateWindow,
    pub returning: Returning,
    pub date_format: DateFormat,
    pub expectations: Option<ReturnExpectations>,
}

/// The date produced by another column
#[derive(Debug, Clone, PartialEq)]
pub struct ValueFrom {
    pub source: String,
    pub date_format: DateFormat,
    pub expectations: Option<ReturnExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vaccination {
    pub target_disease_matches: Option<String>,
    pub product_name_matches: Option<String>,
    pub window: DateWindow,
    pub matching: Option<MatchingRule>,
    pub returning: Returning,
    pub date_format: DateFormat,
    pub expectations: Option<ReturnExpectations>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SgssTest {
    pub pathogen: String,
    pub test_result: TestResult,
    pub window: DateWindow,
    pub matching: Option<MatchingRule>,
    pub returning: Returning,
    pub date_format: DateFormat,
    pub expectations: Option<ReturnExpectations>,
}

/// A resolved query node
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    All,
    RandomSample(RandomSample),
    Sex(Demographic),
    AgeAsOf(AsOfDate),
    RegisteredAsOf(AsOfDate),
    RegisteredWithOnePracticeBetween(Period),
    WithCompleteHistoryBetween(Period),
    MostRecentBmi(MostRecentBmi),
    MeanRecordedValue(MeanRecordedValue),
    WithTheseMedications(EventQuery),
    WithTheseClinicalEvents(EventQuery),
    CategorisedAs(Categorised),
    RegisteredPracticeAsOf(PracticeAsOf),
    AddressAsOf(AddressAsOf),
    CareHomeStatusAsOf(CareHomeStatus),
    AdmittedToIcu(DatedEvents),
    WithTheseCodesOnDeathCertificate(DeathCertificate),
    DiedFromAnyCause(Death),
    WithDeathRecordedInCpns(Death),
    ValueFrom(ValueFrom),
    WithTppVaccinationRecord(Vaccination),
    WithGpConsultations(DatedEvents),
    WithCompleteGpConsultationHistoryBetween(Period),
    WithTestResultInSgss(SgssTest),
}

fn matching_flags(rule: Option<MatchingRule>) -> [(&'static str, ParamValue); 2] {
    [
        ("find_first_match_in_period", ParamValue::Bool(rule == Some(MatchingRule::First))),
        ("find_last_match_in_period", ParamValue::Bool(rule == Some(MatchingRule::Last))),
    ]
}

fn expectations_param(expectations: &Option<ReturnExpectations>) -> (&'static str, ParamValue) {
    ("return_expectations", expectations.clone().into())
}

impl QueryNode {
    /// Canonical operation of this node
    pub fn operation(&self) -> Operation {
        match self {
            Self::All => Operation::All,
            Self::RandomSample(_) => Operation::RandomSample,
            Self::Sex(_) => Operation::Sex,
            Self::AgeAsOf(_) => Operation::AgeAsOf,
            Self::RegisteredAsOf(_) => Operation::RegisteredAsOf,
            Self::RegisteredWithOnePracticeBetween(_) => Operation::RegisteredWithOnePracticeBetween,
            Self::WithCompleteHistoryBetween(_) => Operation::WithCompleteHistoryBetween,
            Self::MostRecentBmi(_) => Operation::MostRecentBmi,
            Self::MeanRecordedValue(_) => Operation::MeanRecordedValue,
            Self::WithTheseMedications(_) => Operation::WithTheseMedications,
            Self::WithTheseClinicalEvents(_) => Operation::WithTheseClinicalEvents,
            Self::CategorisedAs(_) => Operation::CategorisedAs,
            Self::RegisteredPracticeAsOf(_) => Operation::RegisteredPracticeAsOf,
            Self::AddressAsOf(_) => Operation::AddressAsOf,
            Self::CareHomeStatusAsOf(_) => Operation::CareHomeStatusAsOf,
            Self::AdmittedToIcu(_) => Operation::AdmittedToIcu,
            Self::WithTheseCodesOnDeathCertificate(_) => Operation::WithTheseCodesOnDeathCertificate,
            Self::DiedFromAnyCause(_) => Operation::DiedFromAnyCause,
            Self::WithDeathRecordedInCpns(_) => Operation::WithDeathRecordedInCpns,
            Self::ValueFrom(_) => Operation::ValueFrom,
            Self::WithTppVaccinationRecord(_) => Operation::WithTppVaccinationRecord,
            Self::WithGpConsultations(_) => Operation::WithGpConsultations,
            Self::WithCompleteGpConsultationHistoryBetween(_) => {
                Operation::WithCompleteGpConsultationHistoryBetween
            }
            Self::WithTestResultInSgss(_) => Operation::WithTestResultInSgss,
        }
    }

    /// The column's expectations, if any were supplied
    pub fn expectations(&self) -> Option<&ReturnExpectations> {
        match self {
            Self::All => None,
            Self::RandomSample(n) => n.expectations.as_ref(),
            Self::Sex(n) => n.expectations.as_ref(),
            Self::AgeAsOf(n) | Self::RegisteredAsOf(n) => n.expectations.as_ref(),
            Self::RegisteredWithOnePracticeBetween(n)
            | Self::WithCompleteHistoryBetween(n)
            | Self::WithCompleteGpConsultationHistoryBetween(n) => n.expectations.as_ref(),
            Self::MostRecentBmi(n) => n.expectations.as_ref(),
            Self::MeanRecordedValue(n) => n.expectations.as_ref(),
            Self::WithTheseMedications(n) | Self::WithTheseClinicalEvents(n) => n.expectations.as_ref(),
            Self::CategorisedAs(n) => n.expectations.as_ref(),
            Self::RegisteredPracticeAsOf(n) => n.expectations.as_ref(),
            Self::AddressAsOf(n) => n.expectations.as_ref(),
            Self::CareHomeStatusAsOf(n) => n.expectations.as_ref(),
            Self::AdmittedToIcu(n) | Self::WithGpConsultations(n) => n.expectations.as_ref(),
            Self::WithTheseCodesOnDeathCertificate(n) => n.expectations.as_ref(),
            Self::DiedFromAnyCause(n) | Self::WithDeathRecordedInCpns(n) => n.expectations.as_ref(),
            Self::ValueFrom(n) => n.expectations.as_ref(),
            Self::WithTppVaccinationRecord(n) => n.expectations.as_ref(),
            Self::WithTestResultInSgss(n) => n.expectations.as_ref(),
        }
    }

    /// The resolved date window, for date-bounded operations
    pub fn window(&self) -> Option<&DateWindow> {
        match self {
            Self::RegisteredWithOnePracticeBetween(n)
            | Self::WithCompleteHistoryBetween(n)
            | Self::WithCompleteGpConsultationHistoryBetween(n) => Some(&n.window),
            Self::MostRecentBmi(n) => Some(&n.window),
            Self::MeanRecordedValue(n) => Some(&n.window),
            Self::WithTheseMedications(n) | Self::WithTheseClinicalEvents(n) => Some(&n.window),
            Self::AdmittedToIcu(n) | Self::WithGpConsultations(n) => Some(&n.window),
            Self::WithTheseCodesOnDeathCertificate(n) => Some(&n.window),
            Self::DiedFromAnyCause(n) | Self::WithDeathRecordedInCpns(n) => Some(&n.window),
            Self::WithTppVaccinationRecord(n) => Some(&n.window),
            Self::WithTestResultInSgss(n) => Some(&n.window),
            _ => None,
        }
    }

    /// Columns of the enclosing cohort this node depends on
    ///
    /// Names defined by a `categorised_as` node's own extra columns are
    /// resolved locally and are not reported.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        if let Some(window) = self.window() {
            out.extend(window.columns());
        }
        match self {
            Self::AgeAsOf(n) | Self::RegisteredAsOf(n) => out.extend(n.reference_date.as_column()),
            Self::RegisteredPracticeAsOf(n) => out.extend(n.date.as_column()),
            Self::AddressAsOf(n) => out.extend(n.date.as_column()),
            Self::CareHomeStatusAsOf(n) => out.extend(n.date.as_column()),
            Self::ValueFrom(n) => out.push(&n.source),
            Self::CategorisedAs(n) => {
                for nested in n.extra_columns.values() {
                    out.extend(nested.referenced_columns());
                }
                out.extend(
                    n.definitions
                        .columns()
                        .into_iter()
                        .filter(|name| !n.extra_columns.contains_key(*name)),
                );
            }
            _ => {}
        }

        let mut seen: Vec<&str> = Vec::with_capacity(out.len());
        for name in out {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// The full resolved parameter mapping, keyed by `Operation::parameter_names`
    pub fn parameters(&self) -> IndexMap<&'static str, ParamValue> {
        let mut params: Vec<(&'static str, ParamValue)> = Vec::new();
        match self {
            Self::All => {}
            Self::RandomSample(n) => {
                params.push(("percent", n.percent.into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::Sex(n) => params.push(expectations_param(&n.expectations)),
            Self::AgeAsOf(n) | Self::RegisteredAsOf(n) => {
                params.push(("reference_date", n.reference_date.clone().into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::RegisteredWithOnePracticeBetween(n)
            | Self::WithCompleteHistoryBetween(n)
            | Self::WithCompleteGpConsultationHistoryBetween(n) => {
                params.push(("date_window", n.window.clone().into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::MostRecentBmi(n) => {
                params.push(("date_window", n.window.clone().into()));
                params.push((
                    "minimum_age_at_measurement",
                    ParamValue::Int(i64::from(n.minimum_age_at_measurement)),
                ));
                params.push(("include_measurement_date", n.include_measurement_date.into()));
                params.push(("date_format", n.date_format.into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::MeanRecordedValue(n) => {
                params.push(("codelist", n.codelist.clone().into()));
                params.push(("on_most_recent_day_of_measurement", true.into()));
                params.push(("date_window", n.window.clone().into()));
                params.push(("include_measurement_date", n.include_measurement_date.into()));
                params.push(("date_format", n.date_format.into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::WithTheseMedications(n) | Self::WithTheseClinicalEvents(n) => {
                let ignore_key = if matches!(self, Self::WithTheseMedications(_)) {
                    "ignore_days_where_these_clinical_codes_occur"
                } else {
                    "ignore_days_where_these_codes_occur"
                };
                params.push(("codelist", n.codelist.clone().into()));
                params.push(("date_window", n.window.clone().into()));
                params.extend(matching_flags(n.matching));
                params.push(("returning", n.returning.into()));
                params.push(("include_date_of_match", n.include_date_of_match.into()));
                params.push(("date_format", n.date_format.into()));
                params.push((ignore_key, n.ignore_days_where.clone().into()));
                params.push((
                    "episode_defined_as",
                    n.episode.map(|e| e.to_string()).into(),
                ));
                params.push(expectations_param(&n.expectations));
            }
            Self::CategorisedAs(n) => {
                params.push(("category_definitions", n.definitions.clone().into()));
                params.push(("extra_columns", n.extra_columns.clone().into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::RegisteredPracticeAsOf(n) => {
                params.push(("date", n.date.clone().into()));
                params.push(("returning", n.returning.into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::AddressAsOf(n) => {
                params.push(("date", n.date.clone().into()));
                params.push(("returning", n.returning.into()));
                params.push(("round_to_nearest", n.round_to_nearest.map(i64::from).into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::CareHomeStatusAsOf(n) => {
                params.push(("date", n.date.clone().into()));
                params.push(("categorised_as", n.categories.clone().into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::AdmittedToIcu(n) | Self::WithGpConsultations(n) => {
                params.push(("date_window", n.window.clone().into()));
                params.extend(matching_flags(n.matching));
                params.push(("returning", n.returning.into()));
                params.push(("date_format", n.date_format.into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::WithTheseCodesOnDeathCertificate(n) => {
                params.push(("codelist", n.codelist.clone().into()));
                params.push(("date_window", n.window.clone().into()));
                params.push(("match_only_underlying_cause", n.match_only_underlying_cause.into()));
                params.push(("returning", n.returning.into()));
                params.push(("date_format", n.date_format.into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::DiedFromAnyCause(n) | Self::WithDeathRecordedInCpns(n) => {
                params.push(("date_window", n.window.clone().into()));
                params.push(("returning", n.returning.into()));
                params.push(("date_format", n.date_format.into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::ValueFrom(n) => {
                params.push(("source", ParamValue::Column(n.source.clone())));
                params.push(("returning", Returning::Date.into()));
                params.push(("date_format", n.date_format.into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::WithTppVaccinationRecord(n) => {
                params.push(("target_disease_matches", n.target_disease_matches.clone().into()));
                params.push(("product_name_matches", n.product_name_matches.clone().into()));
                params.push(("date_window", n.window.clone().into()));
                params.extend(matching_flags(n.matching));
                params.push(("returning", n.returning.into()));
                params.push(("date_format", n.date_format.into()));
                params.push(expectations_param(&n.expectations));
            }
            Self::WithTestResultInSgss(n) => {
                params.push(("pathogen", n.pathogen.clone().into()));
                params.push(("test_result", n.test_result.into()));
                params.push(("date_window", n.window.clone().into()));
                params.extend(matching_flags(n.matching));
                params.push(("returning", n.returning.into()));
                params.push(("date_format", n.date_format.into()));
                params.push(expectations_param(&n.expectations));
            }
        }
        params.into_iter().collect()
    }
}

impl Serialize for QueryNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("QueryNode", 2)?;
        state.serialize_field("operation", &self.operation())?;
        state.serialize_field("parameters", &self.parameters())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_definition() {
        let def = EpisodeDefinition::parse("series of events each <= 28 days apart").unwrap();
        assert_eq!(def.max_gap_days, 28);
        assert_eq!(def.to_string(), "series of events each <= 28 days apart");
        assert_eq!(EpisodeDefinition::parse("events within 28 days"), None);
        assert_eq!(EpisodeDefinition::parse("series of events each <= -1 days apart"), None);
    }

    #[test]
    fn test_value_from_references_source() {
        let node = QueryNode::ValueFrom(ValueFrom {
            source: "first_admission".into(),
            date_format: DateFormat::YearMonthDay,
            expectations: None,
        });
        assert_eq!(node.referenced_columns(), vec!["first_admission"]);
        let params = node.parameters();
        assert_eq!(params.get("returning"), Some(&ParamValue::Str("date".into())));
    }

    #[test]
    fn test_serialize_shape() {
        let node = QueryNode::Sex(Demographic::default());
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"operation": "sex", "parameters": {"return_expectations": null}})
        );
    }
}
