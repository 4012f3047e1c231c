//! Study definitions loaded from JSON

use cohortspec::diagnostics::{CohortError, COH0002, COH0006, COH0301, COH0302, COH0401};
use cohortspec::model::{ExpectationsPolicy, QueryNode};
use cohortspec::{SpecConfig, StudyDefinition};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;

fn study() -> serde_json::Value {
    json!({
        "default_expectations": {
            "rate": "uniform",
            "incidence": 0.5,
            "date": {"earliest": "1900-01-01", "latest": "today"}
        },
        "codelists": {
            "asthma": {"system": "ctv3", "codes": ["H33..", "H330."]},
            "ethnicity": {"system": "ctv3", "codes": [
                {"code": "XaJQx", "category": 1},
                {"code": "XaJR0", "category": 2}
            ]}
        },
        "columns": {
            "population": {"operation": "registered_as_of", "reference_date": "2020-02-01"},
            "age": {
                "operation": "age_as_of",
                "reference_date": "2020-02-01",
                "return_expectations": {"incidence": 1.0, "int": {"distribution": "population_ages"}}
            },
            "asthma": {
                "operation": "with_these_clinical_events",
                "codelist": "asthma",
                "between": ["2019-01-01", "2019-12-31"]
            },
            "ethnicity": {
                "operation": "with_these_clinical_events",
                "codelist": "ethnicity",
                "returning": "category",
                "find_last_match_in_period": true
            },
            "elderly": {
                "operation": "categorised_as",
                "category_definitions": {"1": "age > 65", "0": "DEFAULT"}
            }
        }
    })
}

fn load(value: serde_json::Value) -> cohortspec::Result<cohortspec::CohortSpec> {
    StudyDefinition::from_json(&value.to_string())?.compile(SpecConfig::default())
}

#[test]
fn test_columns_keep_declaration_order() {
    let cohort = load(study()).unwrap();
    let names: Vec<&str> = cohort.columns().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["population", "age", "asthma", "ethnicity", "elderly"]);
    assert!(cohort.diagnostics().is_empty());
}

#[test]
fn test_default_expectations_fill_unset_keys() {
    let cohort = load(study()).unwrap();
    let json = cohort.to_json();

    assert_eq!(
        json["population"]["parameters"]["return_expectations"],
        json!({"rate": "uniform", "incidence": 0.5, "date": {"earliest": "1900-01-01", "latest": "today"}})
    );
    // the column's own keys win
    assert_eq!(json["age"]["parameters"]["return_expectations"]["incidence"], json!(1.0));
    assert_eq!(json["age"]["parameters"]["return_expectations"]["rate"], json!("uniform"));
}

#[test]
fn test_codelists_resolve_by_name() {
    let cohort = load(study()).unwrap();
    let Some(QueryNode::WithTheseClinicalEvents(query)) = cohort.get("ethnicity") else {
        panic!("ethnicity is not an event query");
    };
    assert_eq!(query.codelist.id, "ethnicity");
    assert!(query.codelist.has_categories());
    assert_eq!(
        cohort.to_json()["asthma"]["parameters"]["codelist"],
        json!({"id": "asthma", "system": "ctv3"})
    );
}

#[test]
fn test_category_definitions_keep_order() {
    let cohort = load(study()).unwrap();
    let Some(QueryNode::CategorisedAs(categorised)) = cohort.get("elderly") else {
        panic!("elderly is not categorised");
    };
    let labels: Vec<String> = categorised.definitions.labels().map(ToString::to_string).collect();
    assert_eq!(labels, vec!["1", "0"]);
}

#[test]
fn test_unknown_codelist() {
    let mut value = study();
    value["columns"]["asthma"]["codelist"] = json!("asthma_v2");
    let err = load(value).unwrap_err();
    assert_eq!(err.code(), COH0301);
    assert!(matches!(err, CohortError::Column { ref column, .. } if column == "asthma"));
}

#[test]
fn test_population_is_required() {
    let mut value = study();
    value["columns"].as_object_mut().unwrap().shift_remove("population");
    assert_eq!(load(value).unwrap_err().code(), COH0302);
}

#[test]
fn test_column_errors_are_collected() {
    let mut value = study();
    value["columns"]["asthma"]["on_or_after"] = json!("2019-06-01");
    value["columns"]["ethnicity"]["codelist"] = json!("missing");
    match load(value).unwrap_err() {
        CohortError::Multiple(errors) => {
            let codes: Vec<_> = errors.iter().map(CohortError::code).collect();
            assert_eq!(codes, vec![COH0002, COH0301]);
        }
        other => panic!("expected several errors, got {other:?}"),
    }
}

#[test]
fn test_missing_expectations_policy() {
    let mut value = study();
    value.as_object_mut().unwrap().remove("default_expectations");
    value["columns"].as_object_mut().unwrap().shift_remove("age");
    value["columns"].as_object_mut().unwrap().shift_remove("elderly");

    let definition = StudyDefinition::from_json(&value.to_string()).unwrap();
    let cohort = definition.compile(SpecConfig::default()).unwrap();
    let warned: Vec<&str> = cohort
        .diagnostics()
        .iter()
        .filter(|d| d.code == COH0006)
        .filter_map(|d| d.column.as_deref())
        .collect();
    assert_eq!(warned, vec!["population", "asthma", "ethnicity"]);

    let denied = definition
        .compile(SpecConfig::new().with_policy(ExpectationsPolicy::Deny))
        .unwrap_err();
    assert!(matches!(denied, CohortError::Multiple(ref errors) if errors.len() == 3));
}

#[test]
fn test_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", study()).unwrap();
    let cohort = StudyDefinition::from_path(file.path())
        .unwrap()
        .compile(SpecConfig::default())
        .unwrap();
    assert_eq!(cohort.len(), 5);

    let err = StudyDefinition::from_path(file.path().with_extension("missing")).unwrap_err();
    assert_eq!(err.code(), COH0401);
}
