//! Builder and validator behaviour across the whole vocabulary

#![allow(deprecated)]

use cohortspec_diagnostics::{
    COH0002, COH0003, COH0004, COH0005, COH0007, COH0008, COH0009, COH0103, ErrorCode,
};
use cohortspec_model::patients;
use cohortspec_model::{
    ArgValue, Arguments, CategoryLabel, Codelist, DateFormat, DateRef, EpisodeDuration, Function,
    MatchingRule, ParamValue, PathogenTable, QueryNode, Result, ReturnExpectations, Returning,
    SpecConfig, TestResult, WindowMode,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

fn ctv3() -> Codelist {
    Codelist::new("asthma", "ctv3", ["XaIIZ", "H33.."])
}

fn code(result: Result<QueryNode>) -> ErrorCode {
    result.expect_err("build should fail").code()
}

/// Arguments holding every required value for `function`
fn required(function: Function) -> Arguments {
    let mut args = Arguments::new();
    for name in function.required_arguments() {
        let value = match *name {
            "percent" => ArgValue::Float(10.0),
            "reference_date" | "start_date" | "date" => ArgValue::Text("2020-01-01".into()),
            "end_date" => ArgValue::Text("2020-12-31".into()),
            "codelist" => ArgValue::Codelist(Arc::new(ctv3())),
            "category_definitions" => ArgValue::Categories(vec![
                (CategoryLabel::Int(1), "age > 65".into()),
                (CategoryLabel::Int(0), "DEFAULT".into()),
            ]),
            "returning" => ArgValue::Text(function.operation().returning_values()[0].as_str().into()),
            "source" => ArgValue::Text("first_admission".into()),
            "expression" => ArgValue::Text("age > 65".into()),
            other => panic!("no fixture for required argument {other}"),
        };
        args.set(function, name, value).unwrap();
    }
    if function.accepts("target_disease_matches") {
        args.set(function, "target_disease_matches", ArgValue::Text("SARS-2 CORONAVIRUS".into()))
            .unwrap();
    }
    if function.accepts("pathogen") {
        args.set(function, "pathogen", ArgValue::Text("SARS-CoV-2".into())).unwrap();
    }
    args
}

#[test]
fn test_required_only_calls_yield_complete_parameters() {
    for function in Function::all() {
        let node = required(function)
            .build(function, &SpecConfig::default())
            .unwrap_or_else(|e| panic!("{function}: {e}"));
        let keys: Vec<&str> = node.parameters().keys().copied().collect();
        assert_eq!(keys, function.operation().parameter_names(), "{function}");
    }
}

#[test]
fn test_between_conflicts_with_discrete_bounds() {
    let bounded: Vec<Function> = Function::all().filter(|f| f.accepts("between")).collect();
    assert_eq!(bounded.len(), 11);
    for function in bounded {
        let mut args = required(function);
        args.set(function, "between", ArgValue::Pair("2020-01-01".into(), "2020-12-31".into()))
            .unwrap();
        args.set(function, "on_or_after", ArgValue::Text("2019-01-01".into()))
            .unwrap();
        let err = args.build(function, &SpecConfig::default()).unwrap_err();
        assert_eq!(err.code(), COH0002, "{function}");
    }
}

#[test]
fn test_both_matching_rules_are_ambiguous() {
    let exposing: Vec<Function> = Function::all()
        .filter(|f| f.accepts("find_first_match_in_period") && f.accepts("find_last_match_in_period"))
        .collect();
    assert_eq!(exposing.len(), 6);
    for function in exposing {
        let mut args = required(function);
        args.set(function, "find_first_match_in_period", ArgValue::Bool(true))
            .unwrap();
        args.set(function, "find_last_match_in_period", ArgValue::Bool(true))
            .unwrap();
        let err = args.build(function, &SpecConfig::default()).unwrap_err();
        assert_eq!(err.code(), COH0003, "{function}");
    }
}

#[test]
fn test_satisfying_equals_explicit_categorisation() {
    let shorthand = patients::satisfying("registered == True").build().unwrap();
    let explicit = patients::categorised_as([(1, "registered == True"), (0, "DEFAULT")])
        .return_expectations(ReturnExpectations::new().with_category_ratios([(1, 1.0), (0, 0.0)]))
        .build()
        .unwrap();
    assert_eq!(shorthand, explicit);
    assert!(!shorthand.parameters().contains_key("expression"));
}

#[test]
fn test_satisfying_keeps_caller_expectations() {
    let mine = ReturnExpectations::new().with_category_ratios([(1, 0.3), (0, 0.7)]);
    let node = patients::satisfying("a = 1")
        .return_expectations(mine.clone())
        .build()
        .unwrap();
    assert_eq!(node.expectations(), Some(&mine));

    let partial = ReturnExpectations::new().with_incidence(0.2);
    let node = patients::satisfying("a = 1")
        .return_expectations(partial.clone())
        .build()
        .unwrap();
    assert_eq!(node.expectations(), Some(&partial));
    assert_eq!(node.expectations().and_then(|e| e.category.as_ref()), None);
}

#[rstest]
#[case("snomed")]
#[case("icd10")]
#[case("dmd")]
fn test_mean_recorded_value_needs_ctv3(#[case] system: &str) {
    let codelist = Codelist::new("sbp", system, ["2469."]);
    assert_eq!(code(patients::mean_recorded_value(codelist).build()), COH0004);
}

#[test]
fn test_mean_recorded_value_only_most_recent_day() {
    let err = patients::mean_recorded_value(ctv3())
        .on_most_recent_day_of_measurement(false)
        .build();
    assert_eq!(code(err), COH0008);
}

#[test]
fn test_legacy_first_date_flag() {
    let node = patients::with_these_clinical_events(ctv3())
        .return_first_date_in_period(true)
        .build()
        .unwrap();
    let QueryNode::WithTheseClinicalEvents(query) = &node else {
        panic!("unexpected node {node:?}");
    };
    assert_eq!(query.returning, Returning::Date);
    assert_eq!(query.matching, Some(MatchingRule::First));
    let params = node.parameters();
    assert_eq!(params["find_first_match_in_period"], ParamValue::Bool(true));
    assert_eq!(params["find_last_match_in_period"], ParamValue::Bool(false));
    assert_eq!(params["returning"], ParamValue::Str("date".into()));
}

#[test]
fn test_legacy_false_flag_is_not_intent() {
    let node = patients::with_these_medications(ctv3())
        .return_binary_flag(false)
        .returning(Returning::NumberOfMatchesInPeriod)
        .build()
        .unwrap();
    assert_eq!(node.parameters()["returning"], ParamValue::Str("number_of_matches_in_period".into()));
}

#[test]
fn test_legacy_conflicts_are_ambiguous() {
    let conflicting_returning = patients::with_these_medications(ctv3())
        .return_binary_flag(true)
        .returning(Returning::Date)
        .find_first_match_in_period(true)
        .build();
    assert_eq!(code(conflicting_returning), COH0003);

    let two_flags = patients::with_these_medications(ctv3())
        .return_binary_flag(true)
        .return_number_of_matches_in_period(true)
        .build();
    assert_eq!(code(two_flags), COH0003);

    let conflicting_rule = patients::with_these_clinical_events(ctv3())
        .return_first_date_in_period(true)
        .find_last_match_in_period(true)
        .build();
    assert_eq!(code(conflicting_rule), COH0003);
}

#[test]
fn test_legacy_date_flags() {
    let node = patients::with_these_clinical_events(ctv3())
        .find_first_match_in_period(true)
        .returning(Returning::Date)
        .include_month(true)
        .build()
        .unwrap();
    assert_eq!(node.parameters()["date_format"], ParamValue::Str("YYYY-MM".into()));

    let day_without_month = patients::with_these_clinical_events(ctv3())
        .include_day(true)
        .build();
    assert_eq!(code(day_without_month), COH0008);

    let contradicting = patients::died_from_any_cause()
        .date_format(DateFormat::Year)
        .include_month(true)
        .build();
    assert_eq!(code(contradicting), COH0003);

    let agreeing = patients::died_from_any_cause()
        .date_format(DateFormat::YearMonth)
        .include_month(true)
        .build()
        .unwrap();
    assert_eq!(agreeing.parameters()["date_format"], ParamValue::Str("YYYY-MM".into()));
}

#[test]
fn test_explicit_default_date_flags_match_omitted() {
    let omitted = patients::died_from_any_cause().build().unwrap();
    let explicit = patients::died_from_any_cause()
        .include_month(false)
        .include_day(false)
        .build()
        .unwrap();
    assert_eq!(omitted.parameters(), explicit.parameters());
    assert_eq!(explicit.parameters()["date_format"], ParamValue::Str("YYYY-MM-DD".into()));

    let icu_omitted = patients::admitted_to_icu().build().unwrap();
    let icu_explicit = patients::admitted_to_icu().include_month(true).build().unwrap();
    assert_eq!(icu_omitted.parameters(), icu_explicit.parameters());

    // a non-default value still carries legacy intent
    let icu_year = patients::admitted_to_icu().include_month(false).build().unwrap();
    assert_eq!(icu_year.parameters()["date_format"], ParamValue::Str("YYYY".into()));
}

#[test]
fn test_icu_defaults_to_month_granularity() {
    let node = patients::admitted_to_icu().build().unwrap();
    assert_eq!(node.parameters()["date_format"], ParamValue::Str("YYYY-MM".into()));

    let with_day = patients::admitted_to_icu().include_day(true).build().unwrap();
    assert_eq!(with_day.parameters()["date_format"], ParamValue::Str("YYYY-MM-DD".into()));
}

#[test]
fn test_single_instance_needs_matching_rule() {
    let date = patients::with_these_clinical_events(ctv3())
        .returning(Returning::Date)
        .build();
    assert_eq!(code(date), COH0007);

    let with_date = patients::with_these_clinical_events(ctv3())
        .include_date_of_match(true)
        .build();
    assert_eq!(code(with_date), COH0007);

    let vaccination = patients::with_tpp_vaccination_record()
        .target_disease_matches("INFLUENZA")
        .returning(Returning::Date)
        .build();
    assert_eq!(code(vaccination), COH0007);

    // a patient dies once
    let death = patients::died_from_any_cause()
        .returning(Returning::DateOfDeath)
        .build();
    assert!(death.is_ok());
}

#[test]
fn test_category_needs_categorised_codelist() {
    let plain = patients::with_these_clinical_events(ctv3())
        .returning(Returning::Category)
        .find_last_match_in_period(true)
        .build();
    assert_eq!(code(plain), COH0008);

    let ethnicity = Codelist::categorised("ethnicity", "ctv3", [("Y9930", 1), ("XaJRB", 2)]);
    let node = patients::with_these_clinical_events(ethnicity)
        .returning(Returning::Category)
        .find_last_match_in_period(true)
        .build()
        .unwrap();
    assert_eq!(node.parameters()["returning"], ParamValue::Str("category".into()));
}

#[test]
fn test_unsupported_returning() {
    let err = patients::with_these_medications(ctv3())
        .returning(Returning::NumericValue)
        .find_first_match_in_period(true)
        .build();
    assert_eq!(code(err), COH0008);
}

#[test]
fn test_episode_definition() {
    let node = patients::with_these_clinical_events(ctv3())
        .returning(Returning::NumberOfEpisodes)
        .episode_defined_as("series of events each <= 28 days apart")
        .build()
        .unwrap();
    assert_eq!(
        node.parameters()["episode_defined_as"],
        ParamValue::Str("series of events each <= 28 days apart".into())
    );

    let bad = patients::with_these_clinical_events(ctv3())
        .episode_defined_as("within 28 days")
        .build();
    assert_eq!(code(bad), COH0008);
}

#[test]
fn test_window_modes() {
    let node = patients::with_these_clinical_events(ctv3())
        .on_or_after("index_date")
        .build()
        .unwrap();
    let window = node.window().unwrap();
    assert_eq!(window.mode, WindowMode::OnOrAfterOnly);
    assert_eq!(window.start, Some(DateRef::Column("index_date".into())));
    assert_eq!(node.referenced_columns(), vec!["index_date"]);

    let open = patients::with_these_clinical_events(ctv3()).build().unwrap();
    assert_eq!(open.window().unwrap().mode, WindowMode::Open);

    let reversed = patients::with_these_clinical_events(ctv3())
        .between("2020-12-31", "2020-01-01")
        .build();
    assert_eq!(code(reversed), COH0009);

    let garbage = patients::most_recent_bmi().on_or_before("31/12/2020").build();
    assert_eq!(code(garbage), COH0009);
}

#[test]
fn test_period_operations_resolve_windows() {
    let node = patients::registered_with_one_practice_between("2019-02-01", "2020-02-01")
        .build()
        .unwrap();
    let window = node.window().unwrap();
    assert_eq!(window.mode, WindowMode::Absolute);
    assert_eq!(
        serde_json::to_value(window).unwrap(),
        serde_json::json!({"start": "2019-02-01", "end": "2020-02-01", "mode": "absolute"})
    );
}

#[test]
fn test_care_home_defaults() {
    let node = patients::care_home_status_as_of("2020-02-01").build().unwrap();
    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(
        json["parameters"]["categorised_as"],
        serde_json::json!({"1": "IsPotentialCareHome", "0": "DEFAULT"})
    );
}

#[test]
fn test_care_home_expression_columns() {
    let ok = patients::care_home_status_as_of("2020-02-01")
        .categorised_as([
            ("PN", "IsPotentialCareHome AND LocationRequiresNursing = 'Y'"),
            ("PC", "IsPotentialCareHome AND LocationDoesNotRequireNursing = 'Y'"),
            ("U", "DEFAULT"),
        ])
        .build();
    assert!(ok.is_ok());

    let err = patients::care_home_status_as_of("2020-02-01")
        .categorised_as([(1, "age > 65"), (0, "DEFAULT")])
        .build();
    assert_eq!(code(err), COH0103);
}

#[test]
fn test_sgss_pathogens() {
    let covid = patients::with_test_result_in_sgss("SARS-CoV-2")
        .test_result(TestResult::Positive)
        .find_first_match_in_period(true)
        .returning(Returning::Date)
        .build()
        .unwrap();
    assert_eq!(covid.parameters()["test_result"], ParamValue::Str("positive".into()));

    let flu = patients::with_test_result_in_sgss("influenza");
    assert_eq!(code(flu.clone().build()), COH0005);

    let config = SpecConfig::new().with_pathogens(PathogenTable::default().with("influenza", EpisodeDuration::Days(14)));
    assert!(flu.build_with(&config).is_ok());
}

#[test]
fn test_sgss_missing_pathogen() {
    let function: Function = "with_test_result_in_sgss".parse().unwrap();
    let err = Arguments::new().build(function, &SpecConfig::default()).unwrap_err();
    assert_eq!(err.code(), COH0005);
}

#[test]
fn test_date_of() {
    let node = patients::date_of("first_admission")
        .date_format(DateFormat::YearMonth)
        .build()
        .unwrap();
    assert_eq!(node.operation().name(), "value_from");
    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(json["parameters"]["source"], serde_json::json!({"column": "first_admission"}));
    assert_eq!(json["parameters"]["returning"], serde_json::json!("date"));

    let literal = patients::date_of("2020-01-01").build();
    assert_eq!(code(literal), COH0008);
}

#[rstest]
#[case(Returning::IndexOfMultipleDeprivation, 100, true)]
#[case(Returning::IndexOfMultipleDeprivation, 50, false)]
#[case(Returning::RuralUrbanClassification, 100, false)]
fn test_round_to_nearest(#[case] returning: Returning, #[case] round: i64, #[case] ok: bool) {
    let result = patients::address_as_of("2020-02-01", returning)
        .round_to_nearest(round)
        .build();
    assert_eq!(result.is_ok(), ok);
}

#[rstest]
#[case(0.0, false)]
#[case(0.5, true)]
#[case(100.0, true)]
#[case(100.5, false)]
fn test_random_sample_percent(#[case] percent: f64, #[case] ok: bool) {
    assert_eq!(patients::random_sample(percent).build().is_ok(), ok);
}

#[test]
fn test_bmi_defaults() {
    let node = patients::most_recent_bmi().build().unwrap();
    assert_eq!(node.parameters()["minimum_age_at_measurement"], ParamValue::Int(16));

    let negative = patients::most_recent_bmi().minimum_age_at_measurement(-1).build();
    assert_eq!(code(negative), COH0008);
}

#[test]
fn test_vaccination_needs_a_matcher() {
    assert_eq!(code(patients::with_tpp_vaccination_record().build()), COH0008);
    assert!(patients::with_tpp_vaccination_record()
        .product_name_matches("COVID-19 mRNA Vaccine")
        .build()
        .is_ok());
}

#[test]
fn test_unknown_argument_for_function() {
    let mut args = Arguments::new();
    let err = args
        .set(Function::Op(cohortspec_model::Operation::Sex), "codelist", ArgValue::Codelist(Arc::new(ctv3())))
        .unwrap_err();
    assert_eq!(err.code(), COH0008);
}

#[test]
fn test_categorised_extra_columns_resolve_locally() {
    let node = patients::categorised_as([("high", "sbp > 140 AND age > 40"), ("normal", "DEFAULT")])
        .extra_column("sbp", patients::mean_recorded_value(ctv3()).on_or_before("index_date").build().unwrap())
        .build()
        .unwrap();
    assert_eq!(node.referenced_columns(), vec!["index_date", "age"]);
}
