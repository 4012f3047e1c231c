//! Return expectations: the contract handed to the synthetic-data generator

use crate::categories::CategoryLabel;
use cohortspec_diagnostics::{CohortError, Result, COH0013};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How often a value occurs over time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rate {
    Universal,
    Uniform,
    ExponentialIncrease,
}

/// Bounds for generated dates; `"today"` is accepted as a bound
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateExpectation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
}

/// A numeric distribution for generated values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Distribution {
    pub distribution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stddev: Option<f64>,
}

/// Relative frequencies of category labels
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryExpectation {
    pub ratios: IndexMap<CategoryLabel, f64>,
}

impl CategoryExpectation {
    pub fn new(ratios: impl IntoIterator<Item = (CategoryLabel, f64)>) -> Self {
        Self {
            ratios: ratios.into_iter().collect(),
        }
    }

    /// Ratios rescaled to sum to one; `None` when they sum to zero
    pub fn normalized(&self) -> Option<IndexMap<CategoryLabel, f64>> {
        let total: f64 = self.ratios.values().sum();
        if total <= 0.0 {
            return None;
        }
        Some(
            self.ratios
                .iter()
                .map(|(label, ratio)| (label.clone(), ratio / total))
                .collect(),
        )
    }
}

/// Desired distribution of synthetic values for one column
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReturnExpectations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateExpectation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int: Option<Distribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float: Option<Distribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryExpectation>,
}

impl ReturnExpectations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_incidence(mut self, incidence: f64) -> Self {
        self.incidence = Some(incidence);
        self
    }

    pub fn with_dates(mut self, earliest: impl Into<String>, latest: impl Into<String>) -> Self {
        self.date = Some(DateExpectation {
            earliest: Some(earliest.into()),
            latest: Some(latest.into()),
        });
        self
    }

    pub fn with_int(mut self, distribution: Distribution) -> Self {
        self.int = Some(distribution);
        self
    }

    pub fn with_float(mut self, distribution: Distribution) -> Self {
        self.float = Some(distribution);
        self
    }

    pub fn with_category_ratios<L: Into<CategoryLabel>>(mut self, ratios: impl IntoIterator<Item = (L, f64)>) -> Self {
        self.category = Some(CategoryExpectation::new(
            ratios.into_iter().map(|(label, ratio)| (label.into(), ratio)),
        ));
        self
    }

    /// Fill unset keys from study-wide defaults; keys set here win
    pub fn with_defaults(self, defaults: &ReturnExpectations) -> Self {
        Self {
            rate: self.rate.or(defaults.rate),
            incidence: self.incidence.or(defaults.incidence),
            date: self.date.or_else(|| defaults.date.clone()),
            int: self.int.or_else(|| defaults.int.clone()),
            float: self.float.or_else(|| defaults.float.clone()),
            category: self.category.or_else(|| defaults.category.clone()),
        }
    }

    /// Check value ranges, attributing failures to `operation`
    pub fn validate(&self, operation: &str) -> Result<()> {
        let invalid = |message: String| {
            CohortError::invalid_argument_with_code(COH0013, operation, "return_expectations", message)
        };

        if let Some(incidence) = self.incidence {
            if !(0.0..=1.0).contains(&incidence) {
                return Err(invalid(format!("incidence {incidence} is outside 0..=1")));
            }
        }
        if let Some(category) = &self.category {
            if let Some((label, ratio)) = category.ratios.iter().find(|(_, r)| !(**r >= 0.0)) {
                return Err(invalid(format!("ratio {ratio} for category {label} is negative")));
            }
        }
        if let Some(dates) = &self.date {
            for bound in [&dates.earliest, &dates.latest].into_iter().flatten() {
                if bound != "today" && NaiveDate::parse_from_str(bound, "%Y-%m-%d").is_err() {
                    return Err(invalid(format!("'{bound}' is not a YYYY-MM-DD date or \"today\"")));
                }
            }
        }
        for distribution in [&self.int, &self.float].into_iter().flatten() {
            if distribution.stddev.is_some_and(|s| s < 0.0) {
                return Err(invalid("stddev must not be negative".to_string()));
            }
        }
        Ok(())
    }
}
