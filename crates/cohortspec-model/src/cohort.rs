//! Cohort specification: the ordered mapping of column names to nodes

use crate::config::{ExpectationsPolicy, SpecConfig};
use crate::node::QueryNode;
use cohortspec_diagnostics::{CohortError, Diagnostic, Result, COH0006};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Named columns in declaration order
#[derive(Debug, Clone, Default)]
pub struct CohortSpec {
    columns: IndexMap<String, QueryNode>,
    config: SpecConfig,
    diagnostics: Vec<Diagnostic>,
}

impl CohortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SpecConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Define column `name`
    ///
    /// Every column the node refers to must already be defined, which keeps
    /// the specification free of forward references and cycles.
    pub fn add(&mut self, name: impl Into<String>, node: QueryNode) -> Result<()> {
        let name = name.into();
        self.check(&name, &node).map_err(|e| e.in_column(&name))?;
        log::debug!("column '{}' = {}", name, node.operation());
        self.columns.insert(name, node);
        Ok(())
    }

    /// Builder-style [`add`](Self::add)
    pub fn column(mut self, name: impl Into<String>, node: QueryNode) -> Result<Self> {
        self.add(name, node)?;
        Ok(self)
    }

    fn check(&mut self, name: &str, node: &QueryNode) -> Result<()> {
        if self.columns.contains_key(name) {
            return Err(CohortError::duplicate_column(name));
        }
        if let Some(reference) = node
            .referenced_columns()
            .into_iter()
            .find(|r| *r == name || !self.columns.contains_key(*r))
        {
            return Err(CohortError::undefined_column(name, reference));
        }
        // nodes may have been built against another pathogen table
        if let QueryNode::WithTestResultInSgss(test) = node {
            let pathogens = &self.config.pathogens;
            if !pathogens.supports(&test.pathogen) {
                return Err(CohortError::unsupported_pathogen(Some(&test.pathogen), pathogens.pathogens()));
            }
        }

        let operation = node.operation();
        if operation.expectations_required() && node.expectations().is_none() {
            match self.config.expectations_policy {
                ExpectationsPolicy::Ignore => {}
                ExpectationsPolicy::Warn => {
                    let diagnostic = Diagnostic::warning(
                        COH0006,
                        format!("{operation} usually carries return_expectations"),
                    )
                    .with_column(name)
                    .with_help("synthetic data for this column will use generator defaults");
                    log::warn!("column '{name}': {}", diagnostic.message);
                    self.diagnostics.push(diagnostic);
                }
                ExpectationsPolicy::Deny => {
                    return Err(CohortError::missing_expectations(name, operation.name()));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&QueryNode> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &QueryNode)> {
        self.columns.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Advisory findings collected while columns were added
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn config(&self) -> &SpecConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Canonical JSON form `{column: {"operation", "parameters"}}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for CohortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.columns.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patients;
    use crate::ReturnExpectations;
    use crate::{EpisodeDuration, PathogenTable};
    use cohortspec_diagnostics::{Severity, COH0005, COH0010, COH0011};

    fn expectations() -> ReturnExpectations {
        ReturnExpectations::new().with_incidence(0.5)
    }

    #[test]
    fn test_duplicate_column() {
        let mut spec = CohortSpec::new();
        spec.add("population", patients::all().build().unwrap()).unwrap();
        let err = spec.add("population", patients::all().build().unwrap()).unwrap_err();
        assert_eq!(err.code(), COH0010);
        assert_eq!(spec.len(), 1);
    }

    #[test]
    fn test_reference_must_precede() {
        let mut spec = CohortSpec::new();
        let err = spec
            .add("over_65", patients::satisfying("age > 65").build().unwrap())
            .unwrap_err();
        assert_eq!(err.code(), COH0011);

        spec.add(
            "age",
            patients::age_as_of("2020-02-01")
                .return_expectations(expectations())
                .build()
                .unwrap(),
        )
        .unwrap();
        spec.add("over_65", patients::satisfying("age > 65").build().unwrap())
            .unwrap();
        assert_eq!(spec.columns().map(|(name, _)| name).collect::<Vec<_>>(), ["age", "over_65"]);
    }

    #[test]
    fn test_self_reference_is_undefined() {
        let mut spec = CohortSpec::new();
        let err = spec
            .add("x", patients::satisfying("x = 1").build().unwrap())
            .unwrap_err();
        assert_eq!(err.code(), COH0011);
    }

    #[test]
    fn test_expectations_policy() {
        let node = patients::age_as_of("2020-02-01").build().unwrap();

        let mut warn = CohortSpec::new();
        warn.add("age", node.clone()).unwrap();
        assert_eq!(warn.diagnostics().len(), 1);
        assert_eq!(warn.diagnostics()[0].severity, Severity::Warning);
        assert_eq!(warn.diagnostics()[0].column.as_deref(), Some("age"));

        let mut ignore = CohortSpec::with_config(SpecConfig::new().with_policy(ExpectationsPolicy::Ignore));
        ignore.add("age", node.clone()).unwrap();
        assert!(ignore.diagnostics().is_empty());

        let mut deny = CohortSpec::with_config(SpecConfig::new().with_policy(ExpectationsPolicy::Deny));
        let err = deny.add("age", node).unwrap_err();
        assert_eq!(err.code(), COH0006);
        assert!(deny.is_empty());
    }

    #[test]
    fn test_sgss_pathogen_checked_against_cohort_table() {
        let config = SpecConfig::new().with_pathogens(PathogenTable::empty().with("influenza", EpisodeDuration::Days(14)));
        let mut spec = CohortSpec::with_config(config.clone());

        let covid = patients::with_test_result_in_sgss("SARS-CoV-2").build().unwrap();
        let err = spec.add("covid", covid).unwrap_err();
        assert_eq!(err.code(), COH0005);
        assert!(err.to_diagnostic().help.unwrap().contains("influenza"));
        assert!(spec.is_empty());

        let flu = patients::with_test_result_in_sgss("influenza").build_with(&config).unwrap();
        spec.add("flu", flu).unwrap();
        assert!(spec.contains("flu"));
    }

    #[test]
    fn test_sex_needs_no_expectations() {
        let mut spec = CohortSpec::new();
        spec.add("sex", patients::sex().build().unwrap()).unwrap();
        assert!(spec.diagnostics().is_empty());
    }

    #[test]
    fn test_serializes_in_declaration_order() {
        let spec = CohortSpec::new()
            .column("population", patients::all().build().unwrap())
            .unwrap()
            .column("sex", patients::sex().build().unwrap())
            .unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.starts_with(r#"{"population":{"operation":"all""#));
        assert!(json.find("\"sex\"").unwrap() > json.find("\"population\"").unwrap());
    }
}
