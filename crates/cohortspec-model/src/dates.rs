//! Date references, date windows and their resolution
//!
//! Every date-bounded operation accepts the same three idioms: an explicit
//! `between` pair, the discrete `on_or_before`/`on_or_after` bounds, or
//! nothing at all. [`resolve`] canonicalizes them into a single [`DateWindow`],
//! which is embedded verbatim as the node's `date_window` parameter.

use cohortspec_diagnostics::{CohortError, Result, COH0009};
use chrono::NaiveDate;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

/// Either a literal calendar date or the date produced by another column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateRef {
    Literal(NaiveDate),
    Column(String),
}

impl DateRef {
    /// Parse an ISO `YYYY-MM-DD` date or a column name
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Some(Self::Literal(date));
        }
        let mut chars = text.chars();
        let starts_ok = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_');
        if starts_ok && chars.all(|c| c.is_alphanumeric() || c == '_') {
            return Some(Self::Column(text.to_string()));
        }
        None
    }

    /// Parse on behalf of an operation argument
    pub(crate) fn parse_argument(operation: &str, argument: &str, text: &str) -> Result<Self> {
        Self::parse(text).ok_or_else(|| {
            CohortError::invalid_argument_with_code(
                COH0009,
                operation,
                argument,
                format!("'{text}' is neither a YYYY-MM-DD date nor a column name"),
            )
        })
    }

    pub fn as_literal(&self) -> Option<NaiveDate> {
        match self {
            Self::Literal(date) => Some(*date),
            Self::Column(_) => None,
        }
    }

    pub fn as_column(&self) -> Option<&str> {
        match self {
            Self::Column(name) => Some(name),
            Self::Literal(_) => None,
        }
    }
}

impl From<NaiveDate> for DateRef {
    fn from(date: NaiveDate) -> Self {
        Self::Literal(date)
    }
}

impl fmt::Display for DateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Column(name) => write!(f, "{name}"),
        }
    }
}

impl Serialize for DateRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Literal(date) => serializer.collect_str(&date.format("%Y-%m-%d")),
            Self::Column(name) => {
                let mut state = serializer.serialize_struct("ColumnRef", 1)?;
                state.serialize_field("column", name)?;
                state.end()
            }
        }
    }
}

/// Shape of a resolved window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Both ends bounded
    Absolute,
    /// Left-open: extends back to the earliest available record
    OnOrBeforeOnly,
    /// Right-open: extends forward to the time of extraction
    OnOrAfterOnly,
    /// No bounds at all
    Open,
}

/// A canonical date window
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DateWindow {
    pub start: Option<DateRef>,
    pub end: Option<DateRef>,
    pub mode: WindowMode,
}

impl DateWindow {
    pub const OPEN: DateWindow = DateWindow {
        start: None,
        end: None,
        mode: WindowMode::Open,
    };

    /// Column names the window depends on
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.start
            .iter()
            .chain(self.end.iter())
            .filter_map(DateRef::as_column)
    }

    /// Check a date against the window, resolving column references through `lookup`
    ///
    /// A bound that refers to a column with no value excludes every date.
    pub fn contains(&self, date: NaiveDate, lookup: impl Fn(&str) -> Option<NaiveDate>) -> bool {
        let resolve = |bound: &DateRef| match bound {
            DateRef::Literal(d) => Some(*d),
            DateRef::Column(name) => lookup(name),
        };
        if let Some(start) = &self.start {
            match resolve(start) {
                Some(start) if date >= start => {}
                _ => return false,
            }
        }
        if let Some(end) = &self.end {
            match resolve(end) {
                Some(end) if date <= end => {}
                _ => return false,
            }
        }
        true
    }
}

impl Default for DateWindow {
    fn default() -> Self {
        Self::OPEN
    }
}

/// The raw date-bound arguments of a single call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateBounds {
    pub on_or_before: Option<DateRef>,
    pub on_or_after: Option<DateRef>,
    pub between: Option<(DateRef, DateRef)>,
}

impl DateBounds {
    pub fn between(start: DateRef, end: DateRef) -> Self {
        Self {
            between: Some((start, end)),
            ..Self::default()
        }
    }
}

/// Whether an operation may be called without any date bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsRequirement {
    Optional,
    Required,
}

/// Resolve date-bound arguments into a canonical window
pub fn resolve(operation: &str, bounds: DateBounds, requirement: BoundsRequirement) -> Result<DateWindow> {
    let DateBounds {
        on_or_before,
        on_or_after,
        between,
    } = bounds;

    if let Some((start, end)) = between {
        if on_or_before.is_some() || on_or_after.is_some() {
            return Err(CohortError::conflicting_date_bounds(operation));
        }
        if let (Some(s), Some(e)) = (start.as_literal(), end.as_literal()) {
            if s > e {
                return Err(CohortError::invalid_argument_with_code(
                    COH0009,
                    operation,
                    "between",
                    format!("start {s} is after end {e}"),
                ));
            }
        }
        return Ok(DateWindow {
            start: Some(start),
            end: Some(end),
            mode: WindowMode::Absolute,
        });
    }

    let window = match (on_or_after, on_or_before) {
        (Some(start), Some(end)) => {
            if let (Some(s), Some(e)) = (start.as_literal(), end.as_literal()) {
                if s > e {
                    return Err(CohortError::invalid_argument_with_code(
                        COH0009,
                        operation,
                        "on_or_after",
                        format!("{s} is after on_or_before {e}"),
                    ));
                }
            }
            DateWindow {
                start: Some(start),
                end: Some(end),
                mode: WindowMode::Absolute,
            }
        }
        (Some(start), None) => DateWindow {
            start: Some(start),
            end: None,
            mode: WindowMode::OnOrAfterOnly,
        },
        (None, Some(end)) => DateWindow {
            start: None,
            end: Some(end),
            mode: WindowMode::OnOrBeforeOnly,
        },
        (None, None) => {
            if requirement == BoundsRequirement::Required {
                return Err(CohortError::invalid_argument_with_code(
                    COH0009,
                    operation,
                    "between",
                    "a date range is required",
                ));
            }
            DateWindow::OPEN
        }
    };
    Ok(window)
}

/// Granularity of returned dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateFormat {
    Year,
    YearMonth,
    #[default]
    YearMonthDay,
}

impl DateFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "YYYY",
            Self::YearMonth => "YYYY-MM",
            Self::YearMonthDay => "YYYY-MM-DD",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "YYYY" => Some(Self::Year),
            "YYYY-MM" => Some(Self::YearMonth),
            "YYYY-MM-DD" => Some(Self::YearMonthDay),
            _ => None,
        }
    }

    /// The format implied by the legacy `include_month`/`include_day` flags
    pub fn from_legacy(include_month: bool, include_day: bool) -> Option<Self> {
        match (include_month, include_day) {
            (false, false) => Some(Self::Year),
            (true, false) => Some(Self::YearMonth),
            (true, true) => Some(Self::YearMonthDay),
            (false, true) => None,
        }
    }

    /// Render a date at this granularity
    pub fn format(&self, date: NaiveDate) -> String {
        match self {
            Self::Year => date.format("%Y").to_string(),
            Self::YearMonth => date.format("%Y-%m").to_string(),
            Self::YearMonthDay => date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DateFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohortspec_diagnostics::COH0002;

    fn date(s: &str) -> DateRef {
        DateRef::parse(s).unwrap()
    }

    #[test]
    fn test_parse_date_ref() {
        assert_eq!(
            DateRef::parse("2020-02-01"),
            Some(DateRef::Literal(NaiveDate::from_ymd_opt(2020, 2, 1).unwrap()))
        );
        assert_eq!(DateRef::parse("first_covid_date"), Some(DateRef::Column("first_covid_date".into())));
        assert_eq!(DateRef::parse("2020-13-01"), None);
        assert_eq!(DateRef::parse("not a date"), None);
    }

    #[test]
    fn test_between_conflicts_with_discrete_bounds() {
        let bounds = DateBounds {
            on_or_after: Some(date("2020-01-01")),
            between: Some((date("2019-01-01"), date("2019-12-31"))),
            ..DateBounds::default()
        };
        let err = resolve("with_these_clinical_events", bounds, BoundsRequirement::Optional).unwrap_err();
        assert_eq!(err.code(), COH0002);
    }

    #[test]
    fn test_modes() {
        let w = resolve(
            "op",
            DateBounds {
                on_or_after: Some(date("2020-01-01")),
                ..DateBounds::default()
            },
            BoundsRequirement::Optional,
        )
        .unwrap();
        assert_eq!(w.mode, WindowMode::OnOrAfterOnly);
        assert_eq!(w.end, None);

        let w = resolve(
            "op",
            DateBounds {
                on_or_before: Some(date("2020-01-01")),
                ..DateBounds::default()
            },
            BoundsRequirement::Optional,
        )
        .unwrap();
        assert_eq!(w.mode, WindowMode::OnOrBeforeOnly);
        assert_eq!(w.start, None);

        let w = resolve("op", DateBounds::default(), BoundsRequirement::Optional).unwrap();
        assert_eq!(w, DateWindow::OPEN);
    }

    #[test]
    fn test_required_window() {
        let err = resolve("registered_with_one_practice_between", DateBounds::default(), BoundsRequirement::Required)
            .unwrap_err();
        assert_eq!(err.code(), COH0009);
    }

    #[test]
    fn test_reversed_between_rejected() {
        let err = resolve(
            "op",
            DateBounds::between(date("2020-12-31"), date("2020-01-01")),
            BoundsRequirement::Optional,
        )
        .unwrap_err();
        assert_eq!(err.code(), COH0009);
    }

    #[test]
    fn test_contains_with_column_bound() {
        let window = resolve(
            "op",
            DateBounds::between(date("index_date"), date("2020-12-31")),
            BoundsRequirement::Optional,
        )
        .unwrap();
        let d = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
        let index = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        assert!(window.contains(d, |_| Some(index)));
        assert!(!window.contains(d, |_| None));
        assert_eq!(window.columns().collect::<Vec<_>>(), vec!["index_date"]);
    }

    #[test]
    fn test_legacy_date_format() {
        assert_eq!(DateFormat::from_legacy(false, false), Some(DateFormat::Year));
        assert_eq!(DateFormat::from_legacy(true, false), Some(DateFormat::YearMonth));
        assert_eq!(DateFormat::from_legacy(false, true), None);
    }

    #[test]
    fn test_window_serialization() {
        let window = resolve(
            "op",
            DateBounds {
                on_or_after: Some(date("index_date")),
                ..DateBounds::default()
            },
            BoundsRequirement::Optional,
        )
        .unwrap();
        let json = serde_json::to_string(&window).unwrap();
        assert_eq!(json, r#"{"start":{"column":"index_date"},"end":null,"mode":"on_or_after_only"}"#);
    }
}
