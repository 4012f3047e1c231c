//! Cohort specification command-line interface

use clap::{Parser, Subcommand};
use cohortspec::cli::output::{self, ColorMode, OutputFormat};
use cohortspec::cli::{compile, validate};
use cohortspec::model::{ExpectationsPolicy, SpecConfig};
use std::path::PathBuf;

/// Cohort specification command-line tool
#[derive(Parser)]
#[command(name = "cohortspec")]
#[command(author, version, about = "Cohort specification tools", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// How to treat columns without return expectations (ignore, warn, deny)
    #[arg(long, default_value = "warn", global = true)]
    policy: ExpectationsPolicy,

    /// Color output
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate study definition files
    Validate {
        /// Study definition files (JSON)
        files: Vec<PathBuf>,

        /// Strict mode (warnings as errors)
        #[arg(short, long)]
        strict: bool,
    },

    /// Compile a study definition to its resolved cohort
    Compile {
        /// Study definition file (JSON)
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    output::setup_colors(cli.color);
    let spec = SpecConfig::new().with_policy(cli.policy);

    let result = match cli.command {
        Commands::Validate { files, strict } => validate::validate(validate::ValidateConfig {
            files,
            strict,
            spec,
            verbose: cli.verbose,
        }),
        Commands::Compile { file, format, output } => compile::compile(compile::CompileConfig {
            file,
            format,
            output_file: output,
            spec,
            verbose: cli.verbose,
        })
        .map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}", output::format_error(&e));
            std::process::exit(1);
        }
    }
}
