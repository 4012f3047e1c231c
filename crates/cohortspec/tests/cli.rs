//! Command helpers behind the `cohortspec` binary

#![cfg(feature = "cli")]

use cohortspec::cli::compile::render;
use cohortspec::cli::output::OutputFormat;
use cohortspec::cli::validate::validate_file;
use cohortspec::diagnostics::{Severity, COH0006, COH0300};
use cohortspec::model::{ExpectationsPolicy, SpecConfig};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const STUDY: &str = r#"{
  "codelists": {"asthma": {"system": "ctv3", "codes": ["H33.."]}},
  "columns": {
    "population": {"operation": "all"},
    "asthma": {"operation": "with_these_clinical_events", "codelist": "asthma"}
  }
}"#;

fn workspace(content: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("study.json");
    fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn test_validate_reports_warnings() {
    let (_dir, path) = workspace(STUDY);
    let report = validate_file(path, &SpecConfig::default());
    assert!(report.errors.is_empty());
    assert_eq!(report.columns, 2);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].code, COH0006);
    assert!(report.passed(false));
    assert!(!report.passed(true));
}

#[test]
fn test_validate_reports_errors() {
    let (_dir, path) = workspace("{\"columns\": {}");
    let report = validate_file(path, &SpecConfig::default());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, COH0300);
    assert_eq!(report.errors[0].severity, Severity::Error);
    assert!(!report.passed(false));
}

#[test]
fn test_validate_with_deny_policy() {
    let (_dir, path) = workspace(STUDY);
    let report = validate_file(path, &SpecConfig::new().with_policy(ExpectationsPolicy::Deny));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].column.as_deref(), Some("asthma"));
}

#[test]
fn test_compile_renders_cohort() {
    let (_dir, path) = workspace(STUDY);
    let rendered = render(&path, SpecConfig::default(), OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["population"], serde_json::json!({"operation": "all", "parameters": {}}));
    assert_eq!(value["asthma"]["operation"], "with_these_clinical_events");
    assert_eq!(value["asthma"]["parameters"]["returning"], "binary_flag");
}
