//! Query functions
//!
//! One function per entry of the cohort vocabulary. Positional arguments are
//! taken here; everything optional is set on the returned [`NodeBuilder`].
//!
//! ```
//! use cohortspec_model::patients;
//! use cohortspec_model::{Codelist, Returning};
//!
//! let asthma = Codelist::new("asthma", "ctv3", ["XaIIZ", "H33.."]);
//! let node = patients::with_these_clinical_events(asthma)
//!     .on_or_before("2020-02-01")
//!     .find_last_match_in_period(true)
//!     .returning(Returning::Date)
//!     .build()
//!     .unwrap();
//! assert_eq!(node.operation().name(), "with_these_clinical_events");
//! ```

mod builder;

pub use builder::{kind, DateBounded, DateFormatted, LegacyDateFlags, MatchingRules, NodeBuilder, Returns};

use crate::categories::CategoryLabel;
use crate::codelist::Codelist;
use crate::operation::{Function, Operation as Op};
use crate::returning::Returning;
use std::sync::Arc;

fn op<K>(operation: Op) -> NodeBuilder<K> {
    NodeBuilder::new(Function::Op(operation))
}

/// Every registered patient
pub fn all() -> NodeBuilder<kind::Plain> {
    op(Op::All)
}

/// Random `percent` of patients, `0 < percent <= 100`
pub fn random_sample(percent: f64) -> NodeBuilder<kind::Sample> {
    op(Op::RandomSample).with(|a| a.percent = Some(percent))
}

pub fn sex() -> NodeBuilder<kind::Plain> {
    op(Op::Sex)
}

/// Age in whole years on `reference_date`
pub fn age_as_of(reference_date: impl Into<String>) -> NodeBuilder<kind::AsOf> {
    op(Op::AgeAsOf).with(|a| a.reference_date = Some(reference_date.into()))
}

pub fn registered_as_of(reference_date: impl Into<String>) -> NodeBuilder<kind::AsOf> {
    op(Op::RegisteredAsOf).with(|a| a.reference_date = Some(reference_date.into()))
}

pub fn registered_with_one_practice_between(
    start_date: impl Into<String>,
    end_date: impl Into<String>,
) -> NodeBuilder<kind::Period> {
    period(Op::RegisteredWithOnePracticeBetween, start_date.into(), end_date.into())
}

pub fn with_complete_history_between(
    start_date: impl Into<String>,
    end_date: impl Into<String>,
) -> NodeBuilder<kind::Period> {
    period(Op::WithCompleteHistoryBetween, start_date.into(), end_date.into())
}

pub fn with_complete_gp_consultation_history_between(
    start_date: impl Into<String>,
    end_date: impl Into<String>,
) -> NodeBuilder<kind::Period> {
    period(Op::WithCompleteGpConsultationHistoryBetween, start_date.into(), end_date.into())
}

fn period(operation: Op, start: String, end: String) -> NodeBuilder<kind::Period> {
    op(operation).with(|a| {
        a.start_date = Some(start);
        a.end_date = Some(end);
    })
}

pub fn most_recent_bmi() -> NodeBuilder<kind::Bmi> {
    op(Op::MostRecentBmi)
}

/// Mean of the values recorded on the most recent day of measurement
pub fn mean_recorded_value(codelist: impl Into<Arc<Codelist>>) -> NodeBuilder<kind::MeanValue> {
    let codelist = codelist.into();
    op(Op::MeanRecordedValue).with(|a| a.codelist = Some(codelist))
}

pub fn with_these_medications(codelist: impl Into<Arc<Codelist>>) -> NodeBuilder<kind::Events> {
    let codelist = codelist.into();
    op(Op::WithTheseMedications).with(|a| a.codelist = Some(codelist))
}

pub fn with_these_clinical_events(codelist: impl Into<Arc<Codelist>>) -> NodeBuilder<kind::Events> {
    let codelist = codelist.into();
    op(Op::WithTheseClinicalEvents).with(|a| a.codelist = Some(codelist))
}

/// Label each patient with the first category whose expression holds
///
/// Exactly one entry must carry the `"DEFAULT"` expression.
pub fn categorised_as<L, S>(definitions: impl IntoIterator<Item = (L, S)>) -> NodeBuilder<kind::Categories>
where
    L: Into<CategoryLabel>,
    S: Into<String>,
{
    let definitions = definitions.into_iter().map(|(l, s)| (l.into(), s.into())).collect();
    op(Op::CategorisedAs).with(|a| a.category_definitions = Some(definitions))
}

/// `1` where `expression` holds, `0` otherwise
pub fn satisfying(expression: impl Into<String>) -> NodeBuilder<kind::Categories> {
    NodeBuilder::new(Function::Satisfying).with(|a| a.expression = Some(expression.into()))
}

pub fn registered_practice_as_of(date: impl Into<String>, returning: Returning) -> NodeBuilder<kind::Practice> {
    as_of_returning(Op::RegisteredPracticeAsOf, date.into(), returning)
}

pub fn address_as_of(date: impl Into<String>, returning: Returning) -> NodeBuilder<kind::Address> {
    as_of_returning(Op::AddressAsOf, date.into(), returning)
}

fn as_of_returning<K>(operation: Op, date: String, returning: Returning) -> NodeBuilder<K> {
    op(operation).with(|a| {
        a.date = Some(date);
        a.returning = Some(returning.as_str().to_string());
    })
}

pub fn care_home_status_as_of(date: impl Into<String>) -> NodeBuilder<kind::CareHome> {
    op(Op::CareHomeStatusAsOf).with(|a| a.date = Some(date.into()))
}

pub fn admitted_to_icu() -> NodeBuilder<kind::Icu> {
    op(Op::AdmittedToIcu)
}

pub fn with_these_codes_on_death_certificate(codelist: impl Into<Arc<Codelist>>) -> NodeBuilder<kind::DeathCodes> {
    let codelist = codelist.into();
    op(Op::WithTheseCodesOnDeathCertificate).with(|a| a.codelist = Some(codelist))
}

pub fn died_from_any_cause() -> NodeBuilder<kind::Death> {
    op(Op::DiedFromAnyCause)
}

pub fn with_death_recorded_in_cpns() -> NodeBuilder<kind::Death> {
    op(Op::WithDeathRecordedInCpns)
}

/// Date held by another column, reformatted
pub fn date_of(source: impl Into<String>) -> NodeBuilder<kind::DateOf> {
    NodeBuilder::new(Function::DateOf).with(|a| a.source = Some(source.into()))
}

/// Needs `target_disease_matches` and/or `product_name_matches`
pub fn with_tpp_vaccination_record() -> NodeBuilder<kind::Vaccination> {
    op(Op::WithTppVaccinationRecord)
}

pub fn with_gp_consultations() -> NodeBuilder<kind::Consultations> {
    op(Op::WithGpConsultations)
}

pub fn with_test_result_in_sgss(pathogen: impl Into<String>) -> NodeBuilder<kind::Sgss> {
    op(Op::WithTestResultInSgss).with(|a| a.pathogen = Some(pathogen.into()))
}
