//! Reference evaluation of coded event queries
//!
//! Pins down what a compiled query must return for one patient. Events go
//! through the same stages in the same order every time:
//!
//! 1. code list match
//! 2. date window
//! 3. days on which an ignore code occurs are dropped
//! 4. episode collapse, each episode represented by its first event
//! 5. matching rule
//! 6. return shape

use crate::episodes::{group_into_episodes, sgss_events, SgssRecord};
use chrono::NaiveDate;
use cohortspec_diagnostics::{CohortError, Result, COH0200};
use cohortspec_model::node::{EventQuery, SgssTest};
use cohortspec_model::{CategoryLabel, DateFormat, EpisodeDuration, MatchingRule, PathogenTable, Returning};
use std::collections::HashSet;

/// A coded event from a patient record
#[derive(Debug, Clone, PartialEq)]
pub struct CodedEvent {
    pub date: NaiveDate,
    pub code: String,
    /// Numeric result, where the event carries one
    pub value: Option<f64>,
}

impl CodedEvent {
    pub fn new(date: NaiveDate, code: impl Into<String>) -> Self {
        Self {
            date,
            code: code.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

/// Value of one column for one patient
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    Flag(bool),
    /// Formatted with the query's date format
    Date(Option<String>),
    Count(usize),
    Category(Option<CategoryLabel>),
    Code(Option<String>),
    Number(Option<f64>),
}

/// Evaluation result, with the date of the selected event when requested
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub value: ReturnValue,
    pub date_of_match: Option<String>,
}

fn select<T>(items: &[T], rule: Option<MatchingRule>) -> Option<&T> {
    match rule {
        Some(MatchingRule::Last) => items.last(),
        Some(MatchingRule::First) | None => items.first(),
    }
}

fn format_date(format: DateFormat, date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| format.format(d))
}

/// Evaluate a medication or clinical event query over one patient's events
///
/// `dates` resolves column-relative window bounds for this patient.
pub fn evaluate_events(
    query: &EventQuery,
    events: &[CodedEvent],
    dates: impl Fn(&str) -> Option<NaiveDate>,
) -> Result<Match> {
    let ignored_days: HashSet<NaiveDate> = match &query.ignore_days_where {
        Some(ignore) => events
            .iter()
            .filter(|e| ignore.contains(&e.code))
            .map(|e| e.date)
            .collect(),
        None => HashSet::new(),
    };

    let mut qualifying: Vec<&CodedEvent> = events
        .iter()
        .filter(|e| query.codelist.contains(&e.code))
        .filter(|e| query.window.contains(e.date, &dates))
        .filter(|e| !ignored_days.contains(&e.date))
        .collect();
    qualifying.sort_by_key(|e| e.date);

    let representatives: Vec<&CodedEvent> = match query.episode {
        Some(definition) => {
            let days: Vec<NaiveDate> = qualifying.iter().map(|e| e.date).collect();
            let mut offset = 0;
            let mut firsts = Vec::new();
            for episode in group_into_episodes(&days, EpisodeDuration::Days(definition.max_gap_days)) {
                firsts.push(qualifying[offset]);
                offset += episode.dates.len();
            }
            firsts
        }
        None => qualifying.clone(),
    };

    let selected = select(&representatives, query.matching).copied();
    let selected_date = selected.map(|e| e.date);
    let value = match query.returning {
        Returning::BinaryFlag => ReturnValue::Flag(!representatives.is_empty()),
        Returning::Date => ReturnValue::Date(format_date(query.date_format, selected_date)),
        Returning::NumberOfMatchesInPeriod => ReturnValue::Count(qualifying.len()),
        Returning::NumberOfEpisodes => ReturnValue::Count(representatives.len()),
        Returning::Category => {
            ReturnValue::Category(selected.and_then(|e| query.codelist.category_of(&e.code)).cloned())
        }
        Returning::Code => ReturnValue::Code(selected.map(|e| e.code.clone())),
        Returning::NumericValue => ReturnValue::Number(selected.and_then(|e| e.value)),
        other => {
            return Err(CohortError::evaluation(
                COH0200,
                format!("returning={other} is not an event query shape"),
            ));
        }
    };

    Ok(Match {
        value,
        date_of_match: if query.include_date_of_match {
            format_date(query.date_format, selected_date)
        } else {
            None
        },
    })
}

/// Evaluate an SGSS test query over one patient's laboratory results
pub fn evaluate_sgss(
    query: &SgssTest,
    records: &[SgssRecord],
    pathogens: &PathogenTable,
    dates: impl Fn(&str) -> Option<NaiveDate>,
) -> Result<Match> {
    let events: Vec<NaiveDate> = sgss_events(records, pathogens, &query.pathogen, query.test_result)?
        .into_iter()
        .filter(|d| query.window.contains(*d, &dates))
        .collect();

    let value = match query.returning {
        Returning::BinaryFlag => ReturnValue::Flag(!events.is_empty()),
        Returning::Date => ReturnValue::Date(format_date(
            query.date_format,
            select(&events, query.matching).copied(),
        )),
        other => {
            return Err(CohortError::evaluation(
                COH0200,
                format!("returning={other} is not an SGSS shape"),
            ));
        }
    };
    Ok(Match {
        value,
        date_of_match: None,
    })
}
