//! Parameter validation and default resolution
//!
//! Every builder call ends up in [`resolve_node`], which checks the raw
//! arguments against the rules of its operation, resolves deprecated aliases
//! and fills in defaults. All checks run synchronously at build time.

use crate::args::Arguments;
use crate::categories::{CategoryDefinitions, CategoryLabel, DEFAULT_SENTINEL};
use crate::codelist::{Codelist, CodingSystem};
use crate::config::SpecConfig;
use crate::dates::{self, BoundsRequirement, DateBounds, DateFormat, DateRef, DateWindow};
use crate::expectations::ReturnExpectations;
use crate::node::{
    AddressAsOf, AsOfDate, Categorised, CareHomeStatus, DatedEvents, Death, DeathCertificate, Demographic,
    EpisodeDefinition, EventQuery, MeanRecordedValue, MostRecentBmi, Period, PracticeAsOf, QueryNode,
    RandomSample, SgssTest, Vaccination, ValueFrom,
};
use crate::operation::{Function, Operation};
use crate::returning::{MatchingRule, Returning, TestResult};
use cohortspec_diagnostics::{CohortError, Result, COH0103};
use std::sync::Arc;

/// Columns a care home categorisation may refer to
pub const CARE_HOME_COLUMNS: [&str; 3] = [
    "IsPotentialCareHome",
    "LocationRequiresNursing",
    "LocationDoesNotRequireNursing",
];

const DEFAULT_MINIMUM_BMI_AGE: i64 = 16;

/// Validate `args` for `function` and build the resolved node
pub(crate) fn resolve_node(function: Function, args: Arguments, config: &SpecConfig) -> Result<QueryNode> {
    let resolver = Resolver {
        function,
        name: function.name(),
        args,
        config,
    };
    resolver.check_required()?;
    if let Some(expectations) = &resolver.args.return_expectations {
        expectations.validate(resolver.name)?;
    }

    let node = resolver.resolve()?;
    log::debug!("built {} node via {}", node.operation(), function);
    Ok(node)
}

struct Resolver<'a> {
    function: Function,
    name: &'static str,
    args: Arguments,
    config: &'a SpecConfig,
}

impl Resolver<'_> {
    fn operation(&self) -> Operation {
        self.function.operation()
    }

    fn invalid(&self, argument: &str, message: impl Into<String>) -> CohortError {
        CohortError::invalid_argument(self.name, argument, message)
    }

    fn ambiguous(&self, message: impl Into<String>) -> CohortError {
        CohortError::ambiguous_matching_rule(self.name, message)
    }

    fn check_required(&self) -> Result<()> {
        for argument in self.function.required_arguments() {
            if !self.args.is_set(argument) {
                return Err(self.invalid(argument, "missing required argument"));
            }
        }
        Ok(())
    }

    fn expectations(&self) -> Option<ReturnExpectations> {
        self.args.return_expectations.clone()
    }

    fn date(&self, argument: &str, value: &Option<String>) -> Result<DateRef> {
        match value {
            Some(text) => DateRef::parse_argument(self.name, argument, text),
            None => Err(self.invalid(argument, "missing required argument")),
        }
    }

    fn optional_date(&self, argument: &str, value: &Option<String>) -> Result<Option<DateRef>> {
        value
            .as_deref()
            .map(|text| DateRef::parse_argument(self.name, argument, text))
            .transpose()
    }

    /// Canonical window from `on_or_before`/`on_or_after`/`between`
    fn window(&self) -> Result<DateWindow> {
        let between = match &self.args.between {
            Some((start, end)) => Some((
                DateRef::parse_argument(self.name, "between", start)?,
                DateRef::parse_argument(self.name, "between", end)?,
            )),
            None => None,
        };
        let bounds = DateBounds {
            on_or_before: self.optional_date("on_or_before", &self.args.on_or_before)?,
            on_or_after: self.optional_date("on_or_after", &self.args.on_or_after)?,
            between,
        };
        dates::resolve(self.name, bounds, BoundsRequirement::Optional)
    }

    /// Canonical window from a required `start_date`/`end_date` pair
    fn period(&self) -> Result<DateWindow> {
        let start = self.date("start_date", &self.args.start_date)?;
        let end = self.date("end_date", &self.args.end_date)?;
        dates::resolve(self.name, DateBounds::between(start, end), BoundsRequirement::Required)
    }

    fn codelist(&self) -> Result<Arc<Codelist>> {
        self.args
            .codelist
            .clone()
            .ok_or_else(|| self.invalid("codelist", "missing required argument"))
    }

    /// Resolve `date_format` against the legacy `include_month`/`include_day` flags
    ///
    /// A legacy flag only expresses intent when it differs from its default,
    /// so passing a default explicitly resolves exactly like omitting it.
    fn date_format(&self) -> Result<DateFormat> {
        let month_default = self.operation() == Operation::AdmittedToIcu;
        let legacy_given = self.args.include_month.is_some_and(|m| m != month_default)
            || self.args.include_day == Some(true);
        let legacy = if legacy_given {
            let include_month = self.args.include_month.unwrap_or(month_default);
            let include_day = self.args.include_day.unwrap_or(false);
            Some(
                DateFormat::from_legacy(include_month, include_day)
                    .ok_or_else(|| self.invalid("include_day", "include_day requires include_month"))?,
            )
        } else {
            None
        };

        let explicit = match &self.args.date_format {
            Some(text) => Some(DateFormat::parse(text).ok_or_else(|| {
                self.invalid("date_format", format!("'{text}' is not one of YYYY, YYYY-MM, YYYY-MM-DD"))
            })?),
            None => None,
        };

        match (explicit, legacy) {
            (Some(format), Some(implied)) if format != implied => Err(self.ambiguous(format!(
                "date_format {format} conflicts with include_month/include_day, which imply {implied}"
            ))),
            (Some(format), _) => Ok(format),
            (None, Some(implied)) => Ok(implied),
            (None, None) if month_default => Ok(DateFormat::YearMonth),
            (None, None) => Ok(DateFormat::default()),
        }
    }

    fn matching(&self) -> Result<Option<MatchingRule>> {
        let find_first = self.args.find_first_match_in_period.unwrap_or(false);
        let find_last = self.args.find_last_match_in_period.unwrap_or(false);
        MatchingRule::from_flags(find_first, find_last).ok_or_else(|| {
            self.ambiguous("find_first_match_in_period and find_last_match_in_period are mutually exclusive")
        })
    }

    fn parse_returning(&self, text: &str) -> Result<Returning> {
        let allowed = self.operation().returning_values();
        match Returning::parse(text) {
            Some(returning) if allowed.contains(&returning) => Ok(returning),
            _ => {
                let names: Vec<&str> = allowed.iter().map(Returning::as_str).collect();
                Err(self.invalid(
                    "returning",
                    format!("unsupported value '{text}', expected one of: {}", names.join(", ")),
                ))
            }
        }
    }

    /// Explicit `returning`, or the operation default
    fn returning(&self) -> Result<Returning> {
        match &self.args.returning {
            Some(text) => self.parse_returning(text),
            None => self
                .operation()
                .returning_values()
                .first()
                .copied()
                .filter(|_| !self.operation().returning_required())
                .ok_or_else(|| self.invalid("returning", "missing required argument")),
        }
    }

    /// The `returning`/matching rule pair implied by the deprecated `return_*` flags
    fn legacy_returning(&self) -> Result<Option<(Returning, Option<MatchingRule>)>> {
        let flags = [
            (self.args.return_binary_flag, "return_binary_flag", Returning::BinaryFlag, None),
            (
                self.args.return_number_of_matches_in_period,
                "return_number_of_matches_in_period",
                Returning::NumberOfMatchesInPeriod,
                None,
            ),
            (
                self.args.return_first_date_in_period,
                "return_first_date_in_period",
                Returning::Date,
                Some(MatchingRule::First),
            ),
            (
                self.args.return_last_date_in_period,
                "return_last_date_in_period",
                Returning::Date,
                Some(MatchingRule::Last),
            ),
        ];
        let set: Vec<_> = flags
            .into_iter()
            .filter(|(value, ..)| *value == Some(true))
            .collect();
        match set.as_slice() {
            [] => Ok(None),
            [(_, _, returning, rule)] => Ok(Some((*returning, *rule))),
            many => {
                let names: Vec<&str> = many.iter().map(|(_, name, ..)| *name).collect();
                Err(self.ambiguous(format!("deprecated flags {} are mutually exclusive", names.join(" and "))))
            }
        }
    }

    /// Reject single-instance return shapes without a matching rule
    fn check_matching_rule(&self, returning: Returning, matching: Option<MatchingRule>, include_date: bool) -> Result<()> {
        if !self.operation().multi_event() || matching.is_some() {
            return Ok(());
        }
        if returning.is_single_instance() {
            return Err(CohortError::missing_matching_rule(self.name, returning.as_str()));
        }
        if include_date {
            return Err(CohortError::missing_matching_rule(
                self.name,
                format!("{returning} with include_date_of_match"),
            ));
        }
        Ok(())
    }

    fn resolve(self) -> Result<QueryNode> {
        let op = self.operation();
        if self.function == Function::Satisfying {
            return self.satisfying();
        }
        let node = match op {
            Operation::All => QueryNode::All,
            Operation::RandomSample => {
                let percent = self.args.percent.unwrap_or(f64::NAN);
                if !(percent > 0.0 && percent <= 100.0) {
                    return Err(self.invalid("percent", format!("{percent} is outside (0, 100]")));
                }
                QueryNode::RandomSample(RandomSample {
                    percent,
                    expectations: self.expectations(),
                })
            }
            Operation::Sex => QueryNode::Sex(Demographic {
                expectations: self.expectations(),
            }),
            Operation::AgeAsOf | Operation::RegisteredAsOf => {
                let record = AsOfDate {
                    reference_date: self.date("reference_date", &self.args.reference_date)?,
                    expectations: self.expectations(),
                };
                if op == Operation::AgeAsOf {
                    QueryNode::AgeAsOf(record)
                } else {
                    QueryNode::RegisteredAsOf(record)
                }
            }
            Operation::RegisteredWithOnePracticeBetween
            | Operation::WithCompleteHistoryBetween
            | Operation::WithCompleteGpConsultationHistoryBetween => {
                let record = Period {
                    window: self.period()?,
                    expectations: self.expectations(),
                };
                match op {
                    Operation::RegisteredWithOnePracticeBetween => QueryNode::RegisteredWithOnePracticeBetween(record),
                    Operation::WithCompleteHistoryBetween => QueryNode::WithCompleteHistoryBetween(record),
                    _ => QueryNode::WithCompleteGpConsultationHistoryBetween(record),
                }
            }
            Operation::MostRecentBmi => {
                let minimum_age = self.args.minimum_age_at_measurement.unwrap_or(DEFAULT_MINIMUM_BMI_AGE);
                let minimum_age_at_measurement = u32::try_from(minimum_age)
                    .map_err(|_| self.invalid("minimum_age_at_measurement", "must not be negative"))?;
                QueryNode::MostRecentBmi(MostRecentBmi {
                    window: self.window()?,
                    minimum_age_at_measurement,
                    include_measurement_date: self.args.include_measurement_date.unwrap_or(false),
                    date_format: self.date_format()?,
                    expectations: self.expectations(),
                })
            }
            Operation::MeanRecordedValue => {
                let codelist = self.codelist()?;
                if codelist.system != CodingSystem::Ctv3 {
                    return Err(CohortError::invalid_code_system(self.name, "ctv3", codelist.system.as_str()));
                }
                if self.args.on_most_recent_day_of_measurement == Some(false) {
                    return Err(self.invalid(
                        "on_most_recent_day_of_measurement",
                        "only the most recent day of measurement is supported",
                    ));
                }
                QueryNode::MeanRecordedValue(MeanRecordedValue {
                    codelist,
                    window: self.window()?,
                    include_measurement_date: self.args.include_measurement_date.unwrap_or(false),
                    date_format: self.date_format()?,
                    expectations: self.expectations(),
                })
            }
            Operation::WithTheseMedications => QueryNode::WithTheseMedications(self.event_query()?),
            Operation::WithTheseClinicalEvents => QueryNode::WithTheseClinicalEvents(self.event_query()?),
            Operation::CategorisedAs => {
                let definitions = self
                    .args
                    .category_definitions
                    .clone()
                    .ok_or_else(|| self.invalid("category_definitions", "missing required argument"))?;
                QueryNode::CategorisedAs(Categorised {
                    definitions: CategoryDefinitions::parse(definitions)?,
                    extra_columns: self.args.extra_columns.clone(),
                    expectations: self.expectations(),
                })
            }
            Operation::RegisteredPracticeAsOf => QueryNode::RegisteredPracticeAsOf(PracticeAsOf {
                date: self.date("date", &self.args.date)?,
                returning: self.returning()?,
                expectations: self.expectations(),
            }),
            Operation::AddressAsOf => {
                let returning = self.returning()?;
                let round_to_nearest = match self.args.round_to_nearest {
                    None => None,
                    Some(_) if returning != Returning::IndexOfMultipleDeprivation => {
                        return Err(self.invalid(
                            "round_to_nearest",
                            "only supported with returning=index_of_multiple_deprivation",
                        ));
                    }
                    Some(n @ (10 | 100 | 1000)) => Some(n as u32),
                    Some(n) => return Err(self.invalid("round_to_nearest", format!("{n} is not one of 10, 100, 1000"))),
                };
                QueryNode::AddressAsOf(AddressAsOf {
                    date: self.date("date", &self.args.date)?,
                    returning,
                    round_to_nearest,
                    expectations: self.expectations(),
                })
            }
            Operation::CareHomeStatusAsOf => QueryNode::CareHomeStatusAsOf(CareHomeStatus {
                date: self.date("date", &self.args.date)?,
                categories: self.care_home_categories()?,
                expectations: self.expectations(),
            }),
            Operation::AdmittedToIcu | Operation::WithGpConsultations => {
                let matching = self.matching()?;
                let returning = self.returning()?;
                self.check_matching_rule(returning, matching, false)?;
                let record = DatedEvents {
                    window: self.window()?,
                    matching,
                    returning,
                    date_format: self.date_format()?,
                    expectations: self.expectations(),
                };
                if op == Operation::AdmittedToIcu {
                    QueryNode::AdmittedToIcu(record)
                } else {
                    QueryNode::WithGpConsultations(record)
                }
            }
            Operation::WithTheseCodesOnDeathCertificate => {
                QueryNode::WithTheseCodesOnDeathCertificate(DeathCertificate {
                    codelist: self.codelist()?,
                    window: self.window()?,
                    match_only_underlying_cause: self.args.match_only_underlying_cause.unwrap_or(false),
                    returning: self.returning()?,
                    date_format: self.date_format()?,
                    expectations: self.expectations(),
                })
            }
            Operation::DiedFromAnyCause | Operation::WithDeathRecordedInCpns => {
                let record = Death {
                    window: self.window()?,
                    returning: self.returning()?,
                    date_format: self.date_format()?,
                    expectations: self.expectations(),
                };
                if op == Operation::DiedFromAnyCause {
                    QueryNode::DiedFromAnyCause(record)
                } else {
                    QueryNode::WithDeathRecordedInCpns(record)
                }
            }
            Operation::ValueFrom => {
                let source = self.date("source", &self.args.source)?;
                let Some(source) = source.as_column() else {
                    return Err(self.invalid("source", "must name another column"));
                };
                QueryNode::ValueFrom(ValueFrom {
                    source: source.to_string(),
                    date_format: self.date_format()?,
                    expectations: self.expectations(),
                })
            }
            Operation::WithTppVaccinationRecord => {
                if self.args.target_disease_matches.is_none() && self.args.product_name_matches.is_none() {
                    return Err(self.invalid(
                        "target_disease_matches",
                        "at least one of target_disease_matches or product_name_matches is required",
                    ));
                }
                let matching = self.matching()?;
                let returning = self.returning()?;
                self.check_matching_rule(returning, matching, false)?;
                QueryNode::WithTppVaccinationRecord(Vaccination {
                    target_disease_matches: self.args.target_disease_matches.clone(),
                    product_name_matches: self.args.product_name_matches.clone(),
                    window: self.window()?,
                    matching,
                    returning,
                    date_format: self.date_format()?,
                    expectations: self.expectations(),
                })
            }
            Operation::WithTestResultInSgss => QueryNode::WithTestResultInSgss(self.sgss_test()?),
        };
        Ok(node)
    }

    fn event_query(&self) -> Result<EventQuery> {
        let codelist = self.codelist()?;
        let window = self.window()?;
        let mut matching = self.matching()?;

        let explicit = self
            .args
            .returning
            .as_deref()
            .map(|text| self.parse_returning(text))
            .transpose()?;
        let returning = match (explicit, self.legacy_returning()?) {
            (Some(returning), Some((implied, _))) if returning != implied => {
                return Err(self.ambiguous(format!(
                    "returning={returning} conflicts with a deprecated return_* flag implying {implied}"
                )));
            }
            (_, Some((implied, legacy_rule))) => {
                if let Some(rule) = legacy_rule {
                    match matching {
                        Some(existing) if existing != rule => {
                            return Err(self.ambiguous(
                                "deprecated return_*_date_in_period flag conflicts with the find_*_match_in_period rule",
                            ));
                        }
                        _ => matching = Some(rule),
                    }
                }
                implied
            }
            (Some(returning), None) => returning,
            (None, None) => Returning::BinaryFlag,
        };

        let include_date_of_match = self.args.include_date_of_match.unwrap_or(false);
        self.check_matching_rule(returning, matching, include_date_of_match)?;

        if returning == Returning::Category && !codelist.has_categories() {
            return Err(self.invalid(
                "returning",
                format!("returning=category needs a categorised codelist, '{}' has none", codelist.id),
            ));
        }

        let episode = match &self.args.episode_defined_as {
            Some(text) => Some(EpisodeDefinition::parse(text).ok_or_else(|| {
                self.invalid(
                    "episode_defined_as",
                    format!("'{text}' does not read 'series of events each <= N days apart'"),
                )
            })?),
            None => None,
        };

        Ok(EventQuery {
            codelist,
            window,
            matching,
            returning,
            include_date_of_match,
            date_format: self.date_format()?,
            ignore_days_where: self.args.ignore_days_where.clone(),
            episode,
            expectations: self.expectations(),
        })
    }

    fn care_home_categories(&self) -> Result<CategoryDefinitions> {
        let definitions = match &self.args.category_definitions {
            Some(defs) => CategoryDefinitions::parse(defs.clone())?,
            None => CategoryDefinitions::parse([(1, CARE_HOME_COLUMNS[0]), (0, DEFAULT_SENTINEL)])?,
        };
        for (_, expression) in definitions.rules() {
            if let Some(column) = expression.columns().into_iter().find(|c| !CARE_HOME_COLUMNS.contains(c)) {
                return Err(CohortError::expression(
                    COH0103,
                    format!(
                        "care home categories may only refer to {}, not '{column}'",
                        CARE_HOME_COLUMNS.join(", ")
                    ),
                    expression.source.clone(),
                ));
            }
        }
        Ok(definitions)
    }

    fn sgss_test(&self) -> Result<SgssTest> {
        let pathogens = &self.config.pathogens;
        let pathogen = match self.args.pathogen.as_deref() {
            Some(p) if pathogens.supports(p) => p.to_string(),
            other => return Err(CohortError::unsupported_pathogen(other, pathogens.pathogens())),
        };
        let test_result = match self.args.test_result.as_deref() {
            None => TestResult::default(),
            Some(text) => TestResult::parse(text)
                .ok_or_else(|| self.invalid("test_result", format!("'{text}' is not one of positive, negative, any")))?,
        };
        let matching = self.matching()?;
        let returning = self.returning()?;
        self.check_matching_rule(returning, matching, false)?;
        Ok(SgssTest {
            pathogen,
            test_result,
            window: self.window()?,
            matching,
            returning,
            date_format: self.date_format()?,
            expectations: self.expectations(),
        })
    }

    /// `satisfying(expression)`: explicit construction of the two-entry categorisation
    fn satisfying(self) -> Result<QueryNode> {
        let expression = self
            .args
            .expression
            .clone()
            .ok_or_else(|| self.invalid("expression", "missing required argument"))?;
        let definitions = CategoryDefinitions::parse([
            (CategoryLabel::Int(1), expression.as_str()),
            (CategoryLabel::Int(0), DEFAULT_SENTINEL),
        ])?;
        // caller expectations are kept whole, ratios are only a fallback
        let expectations = self
            .args
            .return_expectations
            .unwrap_or_else(|| ReturnExpectations::new().with_category_ratios([(1, 1.0), (0, 0.0)]));
        Ok(QueryNode::CategorisedAs(Categorised {
            definitions,
            extra_columns: self.args.extra_columns,
            expectations: Some(expectations),
        }))
    }
}
