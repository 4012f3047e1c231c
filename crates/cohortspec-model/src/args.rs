//! Raw builder arguments, before validation
//!
//! Both the typed builders in [`crate::patients`] and the study-definition
//! loader collect arguments into an [`Arguments`] value; [`Arguments::build`]
//! then runs the single validation and default-resolution path.

use crate::categories::CategoryLabel;
use crate::codelist::Codelist;
use crate::config::SpecConfig;
use crate::expectations::ReturnExpectations;
use crate::node::QueryNode;
use crate::operation::Function;
use cohortspec_diagnostics::{CohortError, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// The kind of value an argument takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Flag,
    Integer,
    Number,
    Text,
    /// A `YYYY-MM-DD` date or a column name
    Date,
    /// A `[start, end]` pair of dates
    DatePair,
    /// The name of a code list
    Codelist,
    Categories,
    Expectations,
    Columns,
}

/// Kind of every argument name in the vocabulary
pub fn argument_kind(name: &str) -> Option<ArgKind> {
    let kind = match name {
        "include_measurement_date"
        | "on_most_recent_day_of_measurement"
        | "find_first_match_in_period"
        | "find_last_match_in_period"
        | "include_date_of_match"
        | "return_binary_flag"
        | "return_number_of_matches_in_period"
        | "return_first_date_in_period"
        | "return_last_date_in_period"
        | "include_month"
        | "include_day"
        | "match_only_underlying_cause" => ArgKind::Flag,
        "minimum_age_at_measurement" | "round_to_nearest" => ArgKind::Integer,
        "percent" => ArgKind::Number,
        "returning" | "date_format" | "episode_defined_as" | "expression" | "source" | "target_disease_matches"
        | "product_name_matches" | "pathogen" | "test_result" => ArgKind::Text,
        "reference_date" | "start_date" | "end_date" | "date" | "on_or_before" | "on_or_after" => ArgKind::Date,
        "between" => ArgKind::DatePair,
        "codelist" | "ignore_days_where_these_codes_occur" | "ignore_days_where_these_clinical_codes_occur" => {
            ArgKind::Codelist
        }
        "category_definitions" | "categorised_as" => ArgKind::Categories,
        "return_expectations" => ArgKind::Expectations,
        "extra_columns" => ArgKind::Columns,
        _ => return None,
    };
    Some(kind)
}

/// A loosely typed argument value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Pair(String, String),
    Codelist(Arc<Codelist>),
    Categories(Vec<(CategoryLabel, String)>),
    Expectations(ReturnExpectations),
    Columns(IndexMap<String, QueryNode>),
}

impl ArgValue {
    fn describe(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "a boolean",
            Self::Int(_) => "an integer",
            Self::Float(_) => "a number",
            Self::Text(_) => "a string",
            Self::Pair(..) => "a pair",
            Self::Codelist(_) => "a codelist",
            Self::Categories(_) => "category definitions",
            Self::Expectations(_) => "expectations",
            Self::Columns(_) => "columns",
        }
    }
}

/// Arguments collected for one builder call
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    pub(crate) reference_date: Option<String>,
    pub(crate) start_date: Option<String>,
    pub(crate) end_date: Option<String>,
    pub(crate) date: Option<String>,
    pub(crate) on_or_before: Option<String>,
    pub(crate) on_or_after: Option<String>,
    pub(crate) between: Option<(String, String)>,
    pub(crate) percent: Option<f64>,
    pub(crate) codelist: Option<Arc<Codelist>>,
    pub(crate) minimum_age_at_measurement: Option<i64>,
    pub(crate) include_measurement_date: Option<bool>,
    pub(crate) on_most_recent_day_of_measurement: Option<bool>,
    pub(crate) find_first_match_in_period: Option<bool>,
    pub(crate) find_last_match_in_period: Option<bool>,
    pub(crate) returning: Option<String>,
    pub(crate) include_date_of_match: Option<bool>,
    pub(crate) date_format: Option<String>,
    pub(crate) ignore_days_where: Option<Arc<Codelist>>,
    pub(crate) episode_defined_as: Option<String>,
    pub(crate) return_binary_flag: Option<bool>,
    pub(crate) return_number_of_matches_in_period: Option<bool>,
    pub(crate) return_first_date_in_period: Option<bool>,
    pub(crate) return_last_date_in_period: Option<bool>,
    pub(crate) include_month: Option<bool>,
    pub(crate) include_day: Option<bool>,
    pub(crate) category_definitions: Option<Vec<(CategoryLabel, String)>>,
    pub(crate) expression: Option<String>,
    pub(crate) extra_columns: IndexMap<String, QueryNode>,
    pub(crate) round_to_nearest: Option<i64>,
    pub(crate) match_only_underlying_cause: Option<bool>,
    pub(crate) source: Option<String>,
    pub(crate) target_disease_matches: Option<String>,
    pub(crate) product_name_matches: Option<String>,
    pub(crate) pathogen: Option<String>,
    pub(crate) test_result: Option<String>,
    pub(crate) return_expectations: Option<ReturnExpectations>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a named argument for `function`
    ///
    /// Rejects names the function does not accept and values of the wrong
    /// kind. `ArgValue::Null` leaves the argument unset.
    pub fn set(&mut self, function: Function, name: &str, value: ArgValue) -> Result<()> {
        if !function.accepts(name) {
            return Err(CohortError::invalid_argument(
                function.name(),
                name,
                "unknown argument",
            ));
        }
        if value == ArgValue::Null {
            return Ok(());
        }

        let mismatch = |value: &ArgValue, expected: &str| {
            CohortError::invalid_argument(
                function.name(),
                name,
                format!("expected {expected}, got {}", value.describe()),
            )
        };

        match (argument_kind(name), value) {
            (Some(ArgKind::Flag), ArgValue::Bool(b)) => *self.flag_slot(name) = Some(b),
            (Some(ArgKind::Integer), ArgValue::Int(i)) => match name {
                "minimum_age_at_measurement" => self.minimum_age_at_measurement = Some(i),
                _ => self.round_to_nearest = Some(i),
            },
            (Some(ArgKind::Number), ArgValue::Int(i)) => self.percent = Some(i as f64),
            (Some(ArgKind::Number), ArgValue::Float(x)) => self.percent = Some(x),
            (Some(ArgKind::Text), ArgValue::Text(text)) => *self.text_slot(name) = Some(text),
            (Some(ArgKind::Date), ArgValue::Text(text)) => *self.date_slot(name) = Some(text),
            (Some(ArgKind::DatePair), ArgValue::Pair(start, end)) => self.between = Some((start, end)),
            (Some(ArgKind::Codelist), ArgValue::Codelist(list)) => match name {
                "codelist" => self.codelist = Some(list),
                _ => self.ignore_days_where = Some(list),
            },
            (Some(ArgKind::Categories), ArgValue::Categories(defs)) => self.category_definitions = Some(defs),
            (Some(ArgKind::Expectations), ArgValue::Expectations(e)) => self.return_expectations = Some(e),
            (Some(ArgKind::Columns), ArgValue::Columns(columns)) => self.extra_columns = columns,
            (Some(kind), other) => return Err(mismatch(&other, kind_name(kind))),
            (None, _) => {
                return Err(CohortError::invalid_argument(function.name(), name, "unknown argument"));
            }
        }
        Ok(())
    }

    /// Whether a named argument has been supplied
    pub fn is_set(&self, name: &str) -> bool {
        match name {
            "reference_date" => self.reference_date.is_some(),
            "start_date" => self.start_date.is_some(),
            "end_date" => self.end_date.is_some(),
            "date" => self.date.is_some(),
            "on_or_before" => self.on_or_before.is_some(),
            "on_or_after" => self.on_or_after.is_some(),
            "between" => self.between.is_some(),
            "percent" => self.percent.is_some(),
            "codelist" => self.codelist.is_some(),
            "ignore_days_where_these_codes_occur" | "ignore_days_where_these_clinical_codes_occur" => {
                self.ignore_days_where.is_some()
            }
            "minimum_age_at_measurement" => self.minimum_age_at_measurement.is_some(),
            "round_to_nearest" => self.round_to_nearest.is_some(),
            "category_definitions" | "categorised_as" => self.category_definitions.is_some(),
            "return_expectations" => self.return_expectations.is_some(),
            "extra_columns" => !self.extra_columns.is_empty(),
            "expression" | "source" | "returning" | "date_format" | "episode_defined_as" | "target_disease_matches"
            | "product_name_matches" | "pathogen" | "test_result" => self.text(name).is_some(),
            other => self.flag(other).is_some(),
        }
    }

    pub fn return_expectations(&self) -> Option<&ReturnExpectations> {
        self.return_expectations.as_ref()
    }

    fn text(&self, name: &str) -> Option<&String> {
        match name {
            "returning" => self.returning.as_ref(),
            "date_format" => self.date_format.as_ref(),
            "episode_defined_as" => self.episode_defined_as.as_ref(),
            "expression" => self.expression.as_ref(),
            "source" => self.source.as_ref(),
            "target_disease_matches" => self.target_disease_matches.as_ref(),
            "product_name_matches" => self.product_name_matches.as_ref(),
            "pathogen" => self.pathogen.as_ref(),
            "test_result" => self.test_result.as_ref(),
            _ => None,
        }
    }

    fn flag(&self, name: &str) -> Option<bool> {
        match name {
            "include_measurement_date" => self.include_measurement_date,
            "on_most_recent_day_of_measurement" => self.on_most_recent_day_of_measurement,
            "find_first_match_in_period" => self.find_first_match_in_period,
            "find_last_match_in_period" => self.find_last_match_in_period,
            "include_date_of_match" => self.include_date_of_match,
            "return_binary_flag" => self.return_binary_flag,
            "return_number_of_matches_in_period" => self.return_number_of_matches_in_period,
            "return_first_date_in_period" => self.return_first_date_in_period,
            "return_last_date_in_period" => self.return_last_date_in_period,
            "include_month" => self.include_month,
            "include_day" => self.include_day,
            "match_only_underlying_cause" => self.match_only_underlying_cause,
            _ => None,
        }
    }

    fn flag_slot(&mut self, name: &str) -> &mut Option<bool> {
        match name {
            "include_measurement_date" => &mut self.include_measurement_date,
            "on_most_recent_day_of_measurement" => &mut self.on_most_recent_day_of_measurement,
            "find_first_match_in_period" => &mut self.find_first_match_in_period,
            "find_last_match_in_period" => &mut self.find_last_match_in_period,
            "include_date_of_match" => &mut self.include_date_of_match,
            "return_binary_flag" => &mut self.return_binary_flag,
            "return_number_of_matches_in_period" => &mut self.return_number_of_matches_in_period,
            "return_first_date_in_period" => &mut self.return_first_date_in_period,
            "return_last_date_in_period" => &mut self.return_last_date_in_period,
            "include_month" => &mut self.include_month,
            "include_day" => &mut self.include_day,
            _ => &mut self.match_only_underlying_cause,
        }
    }

    fn text_slot(&mut self, name: &str) -> &mut Option<String> {
        match name {
            "returning" => &mut self.returning,
            "date_format" => &mut self.date_format,
            "episode_defined_as" => &mut self.episode_defined_as,
            "expression" => &mut self.expression,
            "source" => &mut self.source,
            "target_disease_matches" => &mut self.target_disease_matches,
            "product_name_matches" => &mut self.product_name_matches,
            "pathogen" => &mut self.pathogen,
            _ => &mut self.test_result,
        }
    }

    fn date_slot(&mut self, name: &str) -> &mut Option<String> {
        match name {
            "reference_date" => &mut self.reference_date,
            "start_date" => &mut self.start_date,
            "end_date" => &mut self.end_date,
            "date" => &mut self.date,
            "on_or_before" => &mut self.on_or_before,
            _ => &mut self.on_or_after,
        }
    }

    /// Validate and resolve into a query node
    pub fn build(self, function: Function, config: &SpecConfig) -> Result<QueryNode> {
        crate::validate::resolve_node(function, self, config)
    }
}

fn kind_name(kind: ArgKind) -> &'static str {
    match kind {
        ArgKind::Flag => "a boolean",
        ArgKind::Integer => "an integer",
        ArgKind::Number => "a number",
        ArgKind::Text => "a string",
        ArgKind::Date => "a YYYY-MM-DD date or column name",
        ArgKind::DatePair => "a [start, end] pair",
        ArgKind::Codelist => "a codelist",
        ArgKind::Categories => "category definitions",
        ArgKind::Expectations => "return expectations",
        ArgKind::Columns => "extra columns",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use cohortspec_diagnostics::COH0008;

    #[test]
    fn test_every_accepted_argument_has_a_kind() {
        for function in Function::all() {
            for name in function.arguments() {
                assert!(argument_kind(name).is_some(), "{function}: {name}");
            }
        }
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let mut args = Arguments::new();
        let err = args
            .set(Function::Op(Operation::Sex), "reference_date", ArgValue::Text("2020-01-01".into()))
            .unwrap_err();
        assert_eq!(err.code(), COH0008);
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let mut args = Arguments::new();
        let err = args
            .set(
                Function::Op(Operation::WithTheseClinicalEvents),
                "find_first_match_in_period",
                ArgValue::Text("yes".into()),
            )
            .unwrap_err();
        assert!(err.to_string().contains("expected a boolean"));
    }

    #[test]
    fn test_null_leaves_unset() {
        let mut args = Arguments::new();
        args.set(Function::Op(Operation::AdmittedToIcu), "include_month", ArgValue::Null)
            .unwrap();
        assert!(!args.is_set("include_month"));
        args.set(Function::Op(Operation::AdmittedToIcu), "include_month", ArgValue::Bool(false))
            .unwrap();
        assert!(args.is_set("include_month"));
    }
}
