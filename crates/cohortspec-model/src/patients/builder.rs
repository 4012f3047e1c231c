//! Typed node builder
//!
//! Each query function returns a [`NodeBuilder`] tagged with a marker kind.
//! Argument groups shared by several functions live on capability traits,
//! so a setter is only callable where the function accepts that argument.

use crate::args::Arguments;
use crate::categories::CategoryLabel;
use crate::codelist::Codelist;
use crate::config::SpecConfig;
use crate::dates::DateFormat;
use crate::expectations::ReturnExpectations;
use crate::node::QueryNode;
use crate::operation::Function;
use crate::returning::{Returning, TestResult};
use cohortspec_diagnostics::Result;
use std::marker::PhantomData;
use std::sync::Arc;

/// Builder for one query node
#[derive(Debug, Clone)]
pub struct NodeBuilder<K> {
    function: Function,
    args: Arguments,
    kind: PhantomData<K>,
}

impl<K> NodeBuilder<K> {
    pub(crate) fn new(function: Function) -> Self {
        Self {
            function,
            args: Arguments::new(),
            kind: PhantomData,
        }
    }

    pub(crate) fn args_mut(&mut self) -> &mut Arguments {
        &mut self.args
    }

    pub(crate) fn with(mut self, f: impl FnOnce(&mut Arguments)) -> Self {
        f(&mut self.args);
        self
    }

    pub fn function(&self) -> Function {
        self.function
    }

    /// Synthetic data hints for this column
    pub fn return_expectations(self, expectations: ReturnExpectations) -> Self {
        self.with(|a| a.return_expectations = Some(expectations))
    }

    /// Validate with the default configuration
    pub fn build(self) -> Result<QueryNode> {
        self.build_with(&SpecConfig::default())
    }

    pub fn build_with(self, config: &SpecConfig) -> Result<QueryNode> {
        self.args.build(self.function, config)
    }
}

/// Marker kinds, one per distinct argument signature
pub mod kind {
    macro_rules! kinds {
        ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
            $(
                $(#[$meta])*
                #[derive(Debug, Clone, Copy)]
                pub struct $name;
            )*
        };
    }

    kinds! {
        /// No arguments beyond expectations
        Plain,
        Sample,
        /// A single reference date
        AsOf,
        /// A required start/end period
        Period,
        Bmi,
        MeanValue,
        /// Medications and clinical events
        Events,
        Categories,
        Practice,
        Address,
        CareHome,
        Icu,
        DeathCodes,
        Death,
        DateOf,
        Vaccination,
        Consultations,
        Sgss,
    }
}

macro_rules! capability {
    ($trait_name:ident for $($kind:ident),* $(,)?) => {
        $(impl $trait_name for kind::$kind {})*
    };
}

/// Functions taking `on_or_before`/`on_or_after`/`between`
pub trait DateBounded {}

/// Functions exposing `find_first_match_in_period`/`find_last_match_in_period`
pub trait MatchingRules {}

/// Functions with an optional `returning`
pub trait Returns {}

/// Functions with a `date_format`
pub trait DateFormatted {}

/// Functions still accepting `include_month`/`include_day`
pub trait LegacyDateFlags {}

capability!(DateBounded for Bmi, MeanValue, Events, Icu, DeathCodes, Death, Vaccination, Consultations, Sgss);
capability!(MatchingRules for Events, Icu, Vaccination, Consultations, Sgss);
capability!(Returns for Events, Icu, DeathCodes, Death, Vaccination, Consultations, Sgss);
capability!(DateFormatted for Bmi, MeanValue, Events, Icu, DeathCodes, Death, DateOf, Vaccination, Consultations, Sgss);
capability!(LegacyDateFlags for Bmi, MeanValue, Events, Icu, DeathCodes, Death, DateOf);

impl<K: DateBounded> NodeBuilder<K> {
    /// Date or column name
    pub fn on_or_before(self, date: impl Into<String>) -> Self {
        self.with(|a| a.on_or_before = Some(date.into()))
    }

    pub fn on_or_after(self, date: impl Into<String>) -> Self {
        self.with(|a| a.on_or_after = Some(date.into()))
    }

    /// Inclusive range; mutually exclusive with the discrete bounds
    pub fn between(self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.with(|a| a.between = Some((start.into(), end.into())))
    }
}

impl<K: MatchingRules> NodeBuilder<K> {
    pub fn find_first_match_in_period(self, value: bool) -> Self {
        self.with(|a| a.find_first_match_in_period = Some(value))
    }

    pub fn find_last_match_in_period(self, value: bool) -> Self {
        self.with(|a| a.find_last_match_in_period = Some(value))
    }
}

impl<K: Returns> NodeBuilder<K> {
    pub fn returning(self, returning: Returning) -> Self {
        self.with(|a| a.returning = Some(returning.as_str().to_string()))
    }
}

impl<K: DateFormatted> NodeBuilder<K> {
    pub fn date_format(self, format: DateFormat) -> Self {
        self.with(|a| a.date_format = Some(format.as_str().to_string()))
    }
}

impl<K: LegacyDateFlags> NodeBuilder<K> {
    #[deprecated(note = "use date_format")]
    pub fn include_month(self, value: bool) -> Self {
        self.with(|a| a.include_month = Some(value))
    }

    #[deprecated(note = "use date_format")]
    pub fn include_day(self, value: bool) -> Self {
        self.with(|a| a.include_day = Some(value))
    }
}

impl NodeBuilder<kind::Bmi> {
    pub fn minimum_age_at_measurement(self, age: i64) -> Self {
        self.with(|a| a.minimum_age_at_measurement = Some(age))
    }

    pub fn include_measurement_date(self, value: bool) -> Self {
        self.with(|a| a.include_measurement_date = Some(value))
    }
}

impl NodeBuilder<kind::MeanValue> {
    pub fn include_measurement_date(self, value: bool) -> Self {
        self.with(|a| a.include_measurement_date = Some(value))
    }

    /// Only `true` is supported
    pub fn on_most_recent_day_of_measurement(self, value: bool) -> Self {
        self.with(|a| a.on_most_recent_day_of_measurement = Some(value))
    }
}

impl NodeBuilder<kind::Events> {
    pub fn include_date_of_match(self, value: bool) -> Self {
        self.with(|a| a.include_date_of_match = Some(value))
    }

    /// Exclude events on days where any code of `codelist` was also recorded
    pub fn ignore_days_where(self, codelist: impl Into<Arc<Codelist>>) -> Self {
        let codelist = codelist.into();
        self.with(|a| a.ignore_days_where = Some(codelist))
    }

    /// `"series of events each <= N days apart"`
    pub fn episode_defined_as(self, definition: impl Into<String>) -> Self {
        self.with(|a| a.episode_defined_as = Some(definition.into()))
    }

    #[deprecated(note = "use returning(Returning::BinaryFlag)")]
    pub fn return_binary_flag(self, value: bool) -> Self {
        self.with(|a| a.return_binary_flag = Some(value))
    }

    #[deprecated(note = "use returning(Returning::NumberOfMatchesInPeriod)")]
    pub fn return_number_of_matches_in_period(self, value: bool) -> Self {
        self.with(|a| a.return_number_of_matches_in_period = Some(value))
    }

    #[deprecated(note = "use returning(Returning::Date) with find_first_match_in_period")]
    pub fn return_first_date_in_period(self, value: bool) -> Self {
        self.with(|a| a.return_first_date_in_period = Some(value))
    }

    #[deprecated(note = "use returning(Returning::Date) with find_last_match_in_period")]
    pub fn return_last_date_in_period(self, value: bool) -> Self {
        self.with(|a| a.return_last_date_in_period = Some(value))
    }
}

impl NodeBuilder<kind::Categories> {
    /// Inline a column only visible to the category expressions
    pub fn extra_column(mut self, name: impl Into<String>, node: QueryNode) -> Self {
        self.args_mut().extra_columns.insert(name.into(), node);
        self
    }
}

impl NodeBuilder<kind::Address> {
    /// Only valid with `index_of_multiple_deprivation`
    pub fn round_to_nearest(self, value: i64) -> Self {
        self.with(|a| a.round_to_nearest = Some(value))
    }
}

impl NodeBuilder<kind::CareHome> {
    /// Replace the default potential-care-home flag
    pub fn categorised_as<L, S>(self, definitions: impl IntoIterator<Item = (L, S)>) -> Self
    where
        L: Into<CategoryLabel>,
        S: Into<String>,
    {
        let definitions = definitions.into_iter().map(|(l, s)| (l.into(), s.into())).collect();
        self.with(|a| a.category_definitions = Some(definitions))
    }
}

impl NodeBuilder<kind::DeathCodes> {
    pub fn match_only_underlying_cause(self, value: bool) -> Self {
        self.with(|a| a.match_only_underlying_cause = Some(value))
    }
}

impl NodeBuilder<kind::Vaccination> {
    pub fn target_disease_matches(self, value: impl Into<String>) -> Self {
        self.with(|a| a.target_disease_matches = Some(value.into()))
    }

    pub fn product_name_matches(self, value: impl Into<String>) -> Self {
        self.with(|a| a.product_name_matches = Some(value.into()))
    }
}

impl NodeBuilder<kind::Sgss> {
    pub fn test_result(self, result: TestResult) -> Self {
        self.with(|a| a.test_result = Some(result.as_str().to_string()))
    }
}
