//! Study definitions stored as JSON
//!
//! ```json
//! {
//!   "default_expectations": {"rate": "uniform", "incidence": 0.5},
//!   "codelists": {
//!     "asthma": {"system": "ctv3", "codes": ["H33..", "H330."]},
//!     "ethnicity": {"system": "ctv3", "codes": [{"code": "XaJQx", "category": 1}]}
//!   },
//!   "columns": {
//!     "population": {"operation": "registered_as_of", "reference_date": "2020-02-01"},
//!     "asthma": {"operation": "with_these_clinical_events", "codelist": "asthma"}
//!   }
//! }
//! ```
//!
//! Every column goes through the same validation path as the typed builders,
//! so a definition that loads is a complete [`CohortSpec`].

use cohortspec_diagnostics::{CohortError, Result, COH0300, COH0301, COH0302, COH0401};
use cohortspec_model::{
    argument_kind, ArgKind, ArgValue, Arguments, CategoryLabel, CodeEntry, Codelist, CohortSpec, Function,
    QueryNode, ReturnExpectations, SpecConfig,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Column every study definition must declare
pub const POPULATION: &str = "population";

/// One code, bare or mapped to a category
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CodeSpec {
    Code(String),
    Categorised { code: String, category: CategoryLabel },
}

/// A code list as written in a study definition
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodelistSpec {
    pub system: String,
    pub codes: Vec<CodeSpec>,
}

impl CodelistSpec {
    fn to_codelist(&self, id: &str) -> Codelist {
        Codelist {
            id: id.to_string(),
            system: self.system.as_str().into(),
            codes: self
                .codes
                .iter()
                .map(|spec| match spec {
                    CodeSpec::Code(code) => CodeEntry {
                        code: code.clone(),
                        category: None,
                    },
                    CodeSpec::Categorised { code, category } => CodeEntry {
                        code: code.clone(),
                        category: Some(category.clone()),
                    },
                })
                .collect(),
        }
    }
}

/// A column: an operation name followed by its arguments
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub operation: String,
    #[serde(flatten)]
    pub arguments: IndexMap<String, Value>,
}

/// A parsed, not yet validated, study definition
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudyDefinition {
    #[serde(default)]
    pub default_expectations: Option<ReturnExpectations>,
    #[serde(default)]
    pub codelists: IndexMap<String, CodelistSpec>,
    pub columns: IndexMap<String, ColumnSpec>,
}

impl StudyDefinition {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CohortError::load(COH0300, e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CohortError::system(COH0401, format!("{}: {e}", path.display())))?;
        Self::from_json(&text).map_err(|e| match e {
            CohortError::Load { code, message, .. } => CohortError::Load {
                code,
                message,
                context: Some(path.display().to_string()),
            },
            other => other,
        })
    }

    /// Validate every column and assemble the cohort
    ///
    /// All column errors are collected; a single failure is returned as is.
    pub fn compile(&self, config: SpecConfig) -> Result<CohortSpec> {
        if !self.columns.contains_key(POPULATION) {
            return Err(CohortError::load(
                COH0302,
                format!("study definition has no '{POPULATION}' column"),
            ));
        }

        let codelists: IndexMap<&str, Arc<Codelist>> = self
            .codelists
            .iter()
            .map(|(id, spec)| (id.as_str(), Arc::new(spec.to_codelist(id))))
            .collect();
        let loader = ColumnLoader {
            codelists: &codelists,
            defaults: self.default_expectations.as_ref(),
            config: &config,
        };

        let mut cohort = CohortSpec::with_config(config.clone());
        let mut errors = Vec::new();
        for (name, column) in &self.columns {
            let result = loader
                .node(column)
                .map_err(|e| e.in_column(name))
                .and_then(|node| cohort.add(name, node));
            if let Err(e) = result {
                errors.push(e);
            }
        }

        match errors.len() {
            0 => {
                log::debug!("loaded {} columns, {} codelists", cohort.len(), codelists.len());
                Ok(cohort)
            }
            1 => Err(errors.remove(0)),
            _ => Err(CohortError::Multiple(errors)),
        }
    }
}

struct ColumnLoader<'a> {
    codelists: &'a IndexMap<&'a str, Arc<Codelist>>,
    defaults: Option<&'a ReturnExpectations>,
    config: &'a SpecConfig,
}

impl ColumnLoader<'_> {
    fn node(&self, column: &ColumnSpec) -> Result<QueryNode> {
        let function: Function = column.operation.parse()?;
        let mut args = Arguments::new();
        for (name, value) in &column.arguments {
            let value = self.argument(function, name, value)?;
            args.set(function, name, value)?;
        }

        if let Some(defaults) = self.defaults {
            if function.accepts("return_expectations") {
                let own = args.return_expectations().cloned().unwrap_or_default();
                args.set(
                    function,
                    "return_expectations",
                    ArgValue::Expectations(own.with_defaults(defaults)),
                )?;
            }
        }
        args.build(function, self.config)
    }

    /// Convert a JSON value to the kind `name` takes
    ///
    /// Values of the wrong shape are passed through as their natural kind so
    /// that [`Arguments::set`] reports the mismatch.
    fn argument(&self, function: Function, name: &str, value: &Value) -> Result<ArgValue> {
        let invalid = |message: String| CohortError::invalid_argument(function.name(), name, message);

        let converted = match (argument_kind(name), value) {
            (_, Value::Null) => ArgValue::Null,
            (Some(ArgKind::Codelist), Value::String(id)) => match self.codelists.get(id.as_str()) {
                Some(list) => ArgValue::Codelist(Arc::clone(list)),
                None => return Err(CohortError::load(COH0301, format!("no codelist named '{id}'"))),
            },
            (Some(ArgKind::DatePair), Value::Array(items)) => match items.as_slice() {
                [Value::String(start), Value::String(end)] => ArgValue::Pair(start.clone(), end.clone()),
                _ => return Err(invalid("expected [start, end] dates".to_string())),
            },
            (Some(ArgKind::Categories), Value::Object(map)) => {
                let mut definitions = Vec::with_capacity(map.len());
                for (label, expression) in map {
                    let Value::String(expression) = expression else {
                        return Err(invalid(format!("category {label} must map to an expression string")));
                    };
                    definitions.push((CategoryLabel::from_key(label), expression.clone()));
                }
                ArgValue::Categories(definitions)
            }
            (Some(ArgKind::Expectations), Value::Object(_)) => ArgValue::Expectations(
                serde_json::from_value(value.clone()).map_err(|e| invalid(e.to_string()))?,
            ),
            (Some(ArgKind::Columns), Value::Object(map)) => {
                let mut columns = IndexMap::with_capacity(map.len());
                for (column, spec) in map {
                    let spec: ColumnSpec = serde_json::from_value(spec.clone())
                        .map_err(|e| CohortError::load(COH0300, format!("extra column '{column}': {e}")))?;
                    columns.insert(column.clone(), self.node(&spec).map_err(|e| e.in_column(column))?);
                }
                ArgValue::Columns(columns)
            }
            (_, Value::Bool(b)) => ArgValue::Bool(*b),
            (_, Value::Number(n)) => match n.as_i64() {
                Some(i) => ArgValue::Int(i),
                None => ArgValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            (_, Value::String(s)) => ArgValue::Text(s.clone()),
            (_, other) => return Err(invalid(format!("unexpected value {other}"))),
        };
        Ok(converted)
    }
}
