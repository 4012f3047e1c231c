//! Compile command implementation

use super::output::{self, OutputFormat};
use crate::load::StudyDefinition;
use anyhow::{Context, Result};
use cohortspec_model::SpecConfig;
use std::path::{Path, PathBuf};

/// Configuration for compile command
pub struct CompileConfig {
    pub file: PathBuf,
    pub format: OutputFormat,
    pub output_file: Option<PathBuf>,
    pub spec: SpecConfig,
    pub verbose: bool,
}

/// Load a study definition and render the resolved cohort
pub fn render(file: &Path, spec: SpecConfig, format: OutputFormat) -> Result<String> {
    let study = StudyDefinition::from_path(file)?;
    let cohort = study
        .compile(spec)
        .with_context(|| format!("Failed to compile {}", file.display()))?;
    output::format_json(&cohort.to_json(), format)
}

pub fn compile(config: CompileConfig) -> Result<()> {
    if config.verbose {
        eprintln!("Compiling: {}", config.file.display());
    }
    let rendered = render(&config.file, config.spec, config.format)?;
    output::write_output(&rendered, config.output_file.as_deref())
}
