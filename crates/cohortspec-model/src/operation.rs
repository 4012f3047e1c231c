//! The fixed vocabulary of query operations

use crate::returning::Returning;
use cohortspec_diagnostics::CohortError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Canonical operation names carried by query nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    All,
    RandomSample,
    Sex,
    AgeAsOf,
    RegisteredAsOf,
    RegisteredWithOnePracticeBetween,
    WithCompleteHistoryBetween,
    MostRecentBmi,
    MeanRecordedValue,
    WithTheseMedications,
    WithTheseClinicalEvents,
    CategorisedAs,
    RegisteredPracticeAsOf,
    AddressAsOf,
    CareHomeStatusAsOf,
    AdmittedToIcu,
    WithTheseCodesOnDeathCertificate,
    DiedFromAnyCause,
    WithDeathRecordedInCpns,
    ValueFrom,
    WithTppVaccinationRecord,
    WithGpConsultations,
    WithCompleteGpConsultationHistoryBetween,
    WithTestResultInSgss,
}

use Operation as Op;

const MATCHING_RULES: [&str; 2] = ["find_first_match_in_period", "find_last_match_in_period"];

impl Operation {
    pub const ALL: [Operation; 24] = [
        Op::All,
        Op::RandomSample,
        Op::Sex,
        Op::AgeAsOf,
        Op::RegisteredAsOf,
        Op::RegisteredWithOnePracticeBetween,
        Op::WithCompleteHistoryBetween,
        Op::MostRecentBmi,
        Op::MeanRecordedValue,
        Op::WithTheseMedications,
        Op::WithTheseClinicalEvents,
        Op::CategorisedAs,
        Op::RegisteredPracticeAsOf,
        Op::AddressAsOf,
        Op::CareHomeStatusAsOf,
        Op::AdmittedToIcu,
        Op::WithTheseCodesOnDeathCertificate,
        Op::DiedFromAnyCause,
        Op::WithDeathRecordedInCpns,
        Op::ValueFrom,
        Op::WithTppVaccinationRecord,
        Op::WithGpConsultations,
        Op::WithCompleteGpConsultationHistoryBetween,
        Op::WithTestResultInSgss,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Op::All => "all",
            Op::RandomSample => "random_sample",
            Op::Sex => "sex",
            Op::AgeAsOf => "age_as_of",
            Op::RegisteredAsOf => "registered_as_of",
            Op::RegisteredWithOnePracticeBetween => "registered_with_one_practice_between",
            Op::WithCompleteHistoryBetween => "with_complete_history_between",
            Op::MostRecentBmi => "most_recent_bmi",
            Op::MeanRecordedValue => "mean_recorded_value",
            Op::WithTheseMedications => "with_these_medications",
            Op::WithTheseClinicalEvents => "with_these_clinical_events",
            Op::CategorisedAs => "categorised_as",
            Op::RegisteredPracticeAsOf => "registered_practice_as_of",
            Op::AddressAsOf => "address_as_of",
            Op::CareHomeStatusAsOf => "care_home_status_as_of",
            Op::AdmittedToIcu => "admitted_to_icu",
            Op::WithTheseCodesOnDeathCertificate => "with_these_codes_on_death_certificate",
            Op::DiedFromAnyCause => "died_from_any_cause",
            Op::WithDeathRecordedInCpns => "with_death_recorded_in_cpns",
            Op::ValueFrom => "value_from",
            Op::WithTppVaccinationRecord => "with_tpp_vaccination_record",
            Op::WithGpConsultations => "with_gp_consultations",
            Op::WithCompleteGpConsultationHistoryBetween => "with_complete_gp_consultation_history_between",
            Op::WithTestResultInSgss => "with_test_result_in_sgss",
        }
    }

    /// The full, ordered parameter set of a resolved node
    ///
    /// Deprecated aliases never appear here: they are folded into `returning`,
    /// the matching rule and `date_format` during validation. Date bounds are
    /// canonicalized into the single `date_window` parameter.
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Op::All => &[],
            Op::RandomSample => &["percent", "return_expectations"],
            Op::Sex => &["return_expectations"],
            Op::AgeAsOf | Op::RegisteredAsOf => &["reference_date", "return_expectations"],
            Op::RegisteredWithOnePracticeBetween
            | Op::WithCompleteHistoryBetween
            | Op::WithCompleteGpConsultationHistoryBetween => &["date_window", "return_expectations"],
            Op::MostRecentBmi => &[
                "date_window",
                "minimum_age_at_measurement",
                "include_measurement_date",
                "date_format",
                "return_expectations",
            ],
            Op::MeanRecordedValue => &[
                "codelist",
                "on_most_recent_day_of_measurement",
                "date_window",
                "include_measurement_date",
                "date_format",
                "return_expectations",
            ],
            Op::WithTheseMedications => &[
                "codelist",
                "date_window",
                "find_first_match_in_period",
                "find_last_match_in_period",
                "returning",
                "include_date_of_match",
                "date_format",
                "ignore_days_where_these_clinical_codes_occur",
                "episode_defined_as",
                "return_expectations",
            ],
            Op::WithTheseClinicalEvents => &[
                "codelist",
                "date_window",
                "find_first_match_in_period",
                "find_last_match_in_period",
                "returning",
                "include_date_of_match",
                "date_format",
                "ignore_days_where_these_codes_occur",
                "episode_defined_as",
                "return_expectations",
            ],
            Op::CategorisedAs => &["category_definitions", "extra_columns", "return_expectations"],
            Op::RegisteredPracticeAsOf => &["date", "returning", "return_expectations"],
            Op::AddressAsOf => &["date", "returning", "round_to_nearest", "return_expectations"],
            Op::CareHomeStatusAsOf => &["date", "categorised_as", "return_expectations"],
            Op::AdmittedToIcu | Op::WithGpConsultations => &[
                "date_window",
                "find_first_match_in_period",
                "find_last_match_in_period",
                "returning",
                "date_format",
                "return_expectations",
            ],
            Op::WithTheseCodesOnDeathCertificate => &[
                "codelist",
                "date_window",
                "match_only_underlying_cause",
                "returning",
                "date_format",
                "return_expectations",
            ],
            Op::DiedFromAnyCause | Op::WithDeathRecordedInCpns => {
                &["date_window", "returning", "date_format", "return_expectations"]
            }
            Op::ValueFrom => &["source", "returning", "date_format", "return_expectations"],
            Op::WithTppVaccinationRecord => &[
                "target_disease_matches",
                "product_name_matches",
                "date_window",
                "find_first_match_in_period",
                "find_last_match_in_period",
                "returning",
                "date_format",
                "return_expectations",
            ],
            Op::WithTestResultInSgss => &[
                "pathogen",
                "test_result",
                "date_window",
                "find_first_match_in_period",
                "find_last_match_in_period",
                "returning",
                "date_format",
                "return_expectations",
            ],
        }
    }

    /// Operations whose `return_expectations` are conventionally required
    pub fn expectations_required(&self) -> bool {
        matches!(
            self,
            Op::AgeAsOf
                | Op::RegisteredAsOf
                | Op::RegisteredWithOnePracticeBetween
                | Op::WithCompleteHistoryBetween
                | Op::MostRecentBmi
                | Op::MeanRecordedValue
                | Op::WithTheseMedications
                | Op::WithTheseClinicalEvents
                | Op::RegisteredPracticeAsOf
                | Op::AddressAsOf
                | Op::CareHomeStatusAsOf
                | Op::AdmittedToIcu
                | Op::WithCompleteGpConsultationHistoryBetween
        )
    }

    /// Whether a patient can have more than one qualifying event
    pub fn multi_event(&self) -> bool {
        matches!(
            self,
            Op::WithTheseMedications
                | Op::WithTheseClinicalEvents
                | Op::AdmittedToIcu
                | Op::WithTppVaccinationRecord
                | Op::WithGpConsultations
                | Op::WithTestResultInSgss
        )
    }

    /// Whether the operation takes a `date_window`
    pub fn date_bounded(&self) -> bool {
        self.parameter_names().contains(&"date_window")
    }

    /// Whether the operation exposes both matching-rule flags
    pub fn has_matching_rules(&self) -> bool {
        let names = self.parameter_names();
        MATCHING_RULES.iter().all(|rule| names.contains(rule))
    }

    /// Accepted `returning` values; the first is the default where one exists
    pub fn returning_values(&self) -> &'static [Returning] {
        use Returning as R;
        match self {
            Op::WithTheseMedications => &[
                R::BinaryFlag,
                R::Date,
                R::NumberOfMatchesInPeriod,
                R::NumberOfEpisodes,
                R::Code,
                R::Category,
            ],
            Op::WithTheseClinicalEvents => &[
                R::BinaryFlag,
                R::Date,
                R::NumberOfMatchesInPeriod,
                R::NumberOfEpisodes,
                R::Code,
                R::Category,
                R::NumericValue,
            ],
            Op::RegisteredPracticeAsOf => &[R::PseudoId, R::StpCode, R::MsoaCode, R::Nuts1RegionName],
            Op::AddressAsOf => &[R::IndexOfMultipleDeprivation, R::RuralUrbanClassification],
            Op::AdmittedToIcu => &[R::BinaryFlag, R::DateAdmitted],
            Op::WithTheseCodesOnDeathCertificate => &[R::BinaryFlag, R::DateOfDeath, R::UnderlyingCauseOfDeath],
            Op::DiedFromAnyCause | Op::WithDeathRecordedInCpns => &[R::BinaryFlag, R::DateOfDeath],
            Op::ValueFrom => &[R::Date],
            Op::WithTppVaccinationRecord | Op::WithTestResultInSgss => &[R::BinaryFlag, R::Date],
            Op::WithGpConsultations => &[R::BinaryFlag, R::Date, R::NumberOfMatchesInPeriod],
            _ => &[],
        }
    }

    /// Whether `returning` has to be supplied explicitly
    pub fn returning_required(&self) -> bool {
        matches!(self, Op::RegisteredPracticeAsOf | Op::AddressAsOf)
    }
}

impl FromStr for Operation {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| CohortError::unknown_operation(s))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// The public builder vocabulary
///
/// Builder functions map onto canonical operations; two are sugar forms:
/// `satisfying` builds a `categorised_as` node and `date_of` builds a
/// `value_from` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Op(Operation),
    Satisfying,
    DateOf,
}

impl Function {
    /// Every builder function, in vocabulary order
    pub fn all() -> impl Iterator<Item = Function> {
        Operation::ALL
            .into_iter()
            .map(|op| match op {
                Op::ValueFrom => Function::DateOf,
                other => Function::Op(other),
            })
            .chain(std::iter::once(Function::Satisfying))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Op(op) => op.name(),
            Self::Satisfying => "satisfying",
            Self::DateOf => "date_of",
        }
    }

    /// Canonical operation of the nodes this function builds
    pub fn operation(&self) -> Operation {
        match self {
            Self::Op(op) => *op,
            Self::Satisfying => Op::CategorisedAs,
            Self::DateOf => Op::ValueFrom,
        }
    }

    /// Argument names accepted by the function, legacy aliases included
    pub fn arguments(&self) -> &'static [&'static str] {
        match self {
            Self::Satisfying => &["expression", "return_expectations", "extra_columns"],
            Self::DateOf => &["source", "date_format", "include_month", "include_day", "return_expectations"],
            Self::Op(op) => match op {
                Op::All => &[],
                Op::RandomSample => &["percent", "return_expectations"],
                Op::Sex => &["return_expectations"],
                Op::AgeAsOf | Op::RegisteredAsOf => &["reference_date", "return_expectations"],
                Op::RegisteredWithOnePracticeBetween
                | Op::WithCompleteHistoryBetween
                | Op::WithCompleteGpConsultationHistoryBetween => &["start_date", "end_date", "return_expectations"],
                Op::MostRecentBmi => &[
                    "on_or_before",
                    "on_or_after",
                    "between",
                    "minimum_age_at_measurement",
                    "return_expectations",
                    "include_measurement_date",
                    "date_format",
                    "include_month",
                    "include_day",
                ],
                Op::MeanRecordedValue => &[
                    "codelist",
                    "on_most_recent_day_of_measurement",
                    "return_expectations",
                    "on_or_before",
                    "on_or_after",
                    "between",
                    "include_measurement_date",
                    "date_format",
                    "include_month",
                    "include_day",
                ],
                Op::WithTheseMedications => &[
                    "codelist",
                    "return_expectations",
                    "on_or_before",
                    "on_or_after",
                    "between",
                    "find_first_match_in_period",
                    "find_last_match_in_period",
                    "returning",
                    "include_date_of_match",
                    "date_format",
                    "ignore_days_where_these_clinical_codes_occur",
                    "episode_defined_as",
                    "return_binary_flag",
                    "return_number_of_matches_in_period",
                    "return_first_date_in_period",
                    "return_last_date_in_period",
                    "include_month",
                    "include_day",
                ],
                Op::WithTheseClinicalEvents => &[
                    "codelist",
                    "return_expectations",
                    "on_or_before",
                    "on_or_after",
                    "between",
                    "find_first_match_in_period",
                    "find_last_match_in_period",
                    "returning",
                    "include_date_of_match",
                    "date_format",
                    "ignore_days_where_these_codes_occur",
                    "episode_defined_as",
                    "return_binary_flag",
                    "return_number_of_matches_in_period",
                    "return_first_date_in_period",
                    "return_last_date_in_period",
                    "include_month",
                    "include_day",
                ],
                Op::CategorisedAs => &["category_definitions", "return_expectations", "extra_columns"],
                Op::RegisteredPracticeAsOf => &["date", "returning", "return_expectations"],
                Op::AddressAsOf => &["date", "returning", "round_to_nearest", "return_expectations"],
                Op::CareHomeStatusAsOf => &["date", "categorised_as", "return_expectations"],
                Op::AdmittedToIcu => &[
                    "on_or_after",
                    "on_or_before",
                    "between",
                    "find_first_match_in_period",
                    "find_last_match_in_period",
                    "returning",
                    "date_format",
                    "return_expectations",
                    "include_month",
                    "include_day",
                ],
                Op::WithTheseCodesOnDeathCertificate => &[
                    "codelist",
                    "on_or_before",
                    "on_or_after",
                    "between",
                    "match_only_underlying_cause",
                    "returning",
                    "date_format",
                    "include_month",
                    "include_day",
                    "return_expectations",
                ],
                Op::DiedFromAnyCause | Op::WithDeathRecordedInCpns => &[
                    "on_or_before",
                    "on_or_after",
                    "between",
                    "returning",
                    "date_format",
                    "include_month",
                    "include_day",
                    "return_expectations",
                ],
                // Only reachable through `date_of`
                Op::ValueFrom => &["source", "date_format", "include_month", "include_day", "return_expectations"],
                Op::WithTppVaccinationRecord => &[
                    "target_disease_matches",
                    "product_name_matches",
                    "on_or_before",
                    "on_or_after",
                    "between",
                    "returning",
                    "date_format",
                    "find_first_match_in_period",
                    "find_last_match_in_period",
                    "return_expectations",
                ],
                Op::WithGpConsultations => &[
                    "on_or_before",
                    "on_or_after",
                    "between",
                    "find_first_match_in_period",
                    "find_last_match_in_period",
                    "returning",
                    "date_format",
                    "return_expectations",
                ],
                Op::WithTestResultInSgss => &[
                    "pathogen",
                    "test_result",
                    "on_or_before",
                    "on_or_after",
                    "between",
                    "find_first_match_in_period",
                    "find_last_match_in_period",
                    "returning",
                    "date_format",
                    "return_expectations",
                ],
            },
        }
    }

    /// Positional arguments that must always be supplied
    pub fn required_arguments(&self) -> &'static [&'static str] {
        if *self == Self::Satisfying {
            return &["expression"];
        }
        match self.operation() {
            Op::RandomSample => &["percent"],
            Op::AgeAsOf | Op::RegisteredAsOf => &["reference_date"],
            Op::RegisteredWithOnePracticeBetween
            | Op::WithCompleteHistoryBetween
            | Op::WithCompleteGpConsultationHistoryBetween => &["start_date", "end_date"],
            Op::MeanRecordedValue
            | Op::WithTheseMedications
            | Op::WithTheseClinicalEvents
            | Op::WithTheseCodesOnDeathCertificate => &["codelist"],
            Op::CategorisedAs => &["category_definitions"],
            Op::RegisteredPracticeAsOf | Op::AddressAsOf => &["date", "returning"],
            Op::CareHomeStatusAsOf => &["date"],
            Op::ValueFrom => &["source"],
            _ => &[],
        }
    }

    pub fn accepts(&self, argument: &str) -> bool {
        self.arguments().contains(&argument)
    }
}

impl FromStr for Function {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .find(|f| f.name() == s)
            .ok_or_else(|| CohortError::unknown_operation(s))
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohortspec_diagnostics::COH0001;

    #[test]
    fn test_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_operation() {
        let err = "with_these_diagnoses".parse::<Operation>().unwrap_err();
        assert_eq!(err.code(), COH0001);
        let err = "value_from".parse::<Function>().unwrap_err();
        assert_eq!(err.code(), COH0001);
    }

    #[test]
    fn test_vocabulary() {
        assert_eq!(Function::all().count(), 25);
        assert_eq!("satisfying".parse::<Function>().unwrap().operation(), Operation::CategorisedAs);
        assert_eq!("date_of".parse::<Function>().unwrap().operation(), Operation::ValueFrom);
    }

    #[test]
    fn test_matching_rule_exposure() {
        let exposing: Vec<_> = Operation::ALL.into_iter().filter(|op| op.has_matching_rules()).collect();
        assert_eq!(
            exposing,
            vec![
                Operation::WithTheseMedications,
                Operation::WithTheseClinicalEvents,
                Operation::AdmittedToIcu,
                Operation::WithTppVaccinationRecord,
                Operation::WithGpConsultations,
                Operation::WithTestResultInSgss,
            ]
        );
    }

    #[test]
    fn test_required_arguments_are_accepted() {
        for function in Function::all() {
            for arg in function.required_arguments() {
                assert!(function.accepts(arg), "{function} does not accept {arg}");
            }
        }
    }
}
