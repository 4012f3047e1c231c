//! Validate command implementation

use crate::load::StudyDefinition;
use anyhow::Result;
use cohortspec_diagnostics::{CohortError, Diagnostic};
use cohortspec_model::SpecConfig;
use colored::Colorize;
use std::path::PathBuf;

/// Configuration for validate command
pub struct ValidateConfig {
    pub files: Vec<PathBuf>,
    pub strict: bool,
    pub spec: SpecConfig,
    pub verbose: bool,
}

/// Validation result for a single file
#[derive(Debug)]
pub struct FileReport {
    pub file: PathBuf,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub columns: usize,
}

impl FileReport {
    pub fn passed(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

fn flatten(error: &CohortError, into: &mut Vec<Diagnostic>) {
    match error {
        CohortError::Multiple(errors) => errors.iter().for_each(|e| flatten(e, into)),
        other => into.push(other.to_diagnostic()),
    }
}

/// Load and compile one study definition, collecting its diagnostics
pub fn validate_file(file: PathBuf, spec: &SpecConfig) -> FileReport {
    let mut report = FileReport {
        file,
        errors: Vec::new(),
        warnings: Vec::new(),
        columns: 0,
    };
    match StudyDefinition::from_path(&report.file).and_then(|study| study.compile(spec.clone())) {
        Ok(cohort) => {
            report.columns = cohort.len();
            report.warnings = cohort.diagnostics().to_vec();
        }
        Err(e) => flatten(&e, &mut report.errors),
    }
    report
}

/// Validate study definition files, returning whether all of them passed
pub fn validate(config: ValidateConfig) -> Result<bool> {
    if config.files.is_empty() {
        anyhow::bail!("No files specified for validation");
    }

    let mut passed = true;
    let (mut errors, mut warnings) = (0, 0);
    for file in &config.files {
        if config.verbose {
            eprintln!("Validating: {}", file.display());
        }
        let report = validate_file(file.clone(), &config.spec);
        print_report(&report, config.strict);
        errors += report.errors.len();
        warnings += report.warnings.len();
        passed &= report.passed(config.strict);
    }

    println!();
    if errors == 0 && warnings == 0 {
        println!(
            "{} All {} file(s) validated successfully",
            "Success:".green().bold(),
            config.files.len()
        );
    } else {
        let mut summary = Vec::new();
        if errors > 0 {
            summary.push(format!("{errors} error(s)").red().to_string());
        }
        if warnings > 0 {
            summary.push(format!("{warnings} warning(s)").yellow().to_string());
        }
        eprintln!("{} {}", "Found".bold(), summary.join(", "));
        if config.strict && warnings > 0 {
            eprintln!("{}", "Strict mode: treating warnings as errors".yellow());
        }
    }
    Ok(passed)
}

fn print_report(report: &FileReport, strict: bool) {
    let status = if report.passed(strict) {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{} {}", status, report.file.display().to_string().cyan());
    if report.errors.is_empty() {
        println!("  {} column(s)", report.columns);
    }
    for diagnostic in report.errors.iter().chain(&report.warnings) {
        for line in diagnostic.render_colored().lines() {
            println!("  {line}");
        }
    }
}
