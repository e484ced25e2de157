//! MISRA Gate CLI - fails the build on MISRA violations nobody has accepted yet
//!
//! CDD Principle: Application Layer - CLI coordinates user interactions with domain services
//! - Translates arguments to a ViolationFilter run
//! - Handles process exit codes and terminal output

use clap::{Parser, ValueEnum};
use misra_gate::{MisraResult, OutputFormat, ReportFormatter, ReportOptions, ViolationFilter};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// MISRA Gate - report only new MISRA C:2012 violations
#[derive(Parser)]
#[command(name = "misra-gate")]
#[command(version)]
#[command(about = "Filters a cppcheck MISRA report against accepted deviations and reports new violations")]
#[command(long_about = "Reads a deviation config and a cppcheck MISRA addon report. Violations covered by a \
config deviation, a coverity[misra_c_2012_rule_X_Y_violation] comment above the flagged line, or the optional \
allow-list are dropped. Exits 1 if anything remains.")]
struct Cli {
    /// Deviation config file (JSON, or YAML by extension)
    config: PathBuf,

    /// cppcheck MISRA addon report
    report: PathBuf,

    /// Allow-list of explicitly accepted violations (JSON or YAML)
    #[arg(short, long)]
    allow_list: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormatArg,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
    Github,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Github => OutputFormat::GitHub,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_check(
        cli.config,
        cli.report,
        cli.allow_list,
        cli.format,
        !cli.no_color,
    ) {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_check(
    config_path: PathBuf,
    report_path: PathBuf,
    allow_list_path: Option<PathBuf>,
    format: OutputFormatArg,
    use_colors: bool,
) -> MisraResult<i32> {
    if format == OutputFormatArg::Human {
        println!("MISRA config file provided: {}", config_path.display());
        println!("MISRA report file provided: {}", report_path.display());
    }

    let mut filter = ViolationFilter::from_config_file(&config_path)?
        .with_report_formatter(ReportFormatter::new(ReportOptions { use_colors }));

    if let Some(path) = allow_list_path {
        filter = filter.with_allow_list_file(path)?;
    }

    tracing::debug!(
        "Filtering with {} rule deviation(s) and {} allow-list entries",
        filter.deviations().rules.len(),
        filter.allow_list().map_or(0, |list| list.len())
    );

    let report = filter.filter_report(&report_path)?;

    print!("{}", filter.format_report(&report, format.into())?);

    // Exit 1 when any violation is not accounted for
    if report.has_new_violations() {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::TempDir;

    fn write_inputs(temp_dir: &TempDir, deviation: &str) -> (PathBuf, PathBuf) {
        let source = temp_dir.path().join("a.c");
        fs::write(&source, "int a;\nint b;\nint c;\nint d = c;\nint e = d;\n").unwrap();

        let config = temp_dir.path().join("misra.config");
        fs::write(&config, format!(r#"{{ "deviations": [ {{ "deviation": "{deviation}" }} ] }}"#)).unwrap();

        let report = temp_dir.path().join("misra.md");
        fs::write(
            &report,
            format!(
                "[{}:5] (style) misra violation (use --rule-texts=<file> to get proper output) [misra-c2012-21.2]\n",
                source.display()
            ),
        )
        .unwrap();

        (config, report)
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::try_parse_from(["misra-gate", "misra.config", "misra.md", "-f", "json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("misra.config"));
        assert_eq!(cli.report, PathBuf::from("misra.md"));
        assert!(cli.format == OutputFormatArg::Json);

        assert!(Cli::try_parse_from(["misra-gate", "misra.config"]).is_err());
    }

    #[test]
    fn test_exit_code_without_new_violations() {
        let temp_dir = TempDir::new().unwrap();
        let (config, report) = write_inputs(&temp_dir, "Rule 21.2");

        let result = run_check(config, report, None, OutputFormatArg::Human, false);
        assert_eq!(result.unwrap(), 0);
    }

    #[test]
    fn test_exit_code_with_new_violations() {
        let temp_dir = TempDir::new().unwrap();
        let (config, report) = write_inputs(&temp_dir, "Rule 8.4");

        let result = run_check(config, report, None, OutputFormatArg::Json, false);
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn test_allow_list_option() {
        let temp_dir = TempDir::new().unwrap();
        let (config, report) = write_inputs(&temp_dir, "Rule 8.4");
        let allow_list = temp_dir.path().join("allow.yaml");
        fs::write(&allow_list, "\"21.2\": [\"*\"]\n").unwrap();

        let result = run_check(config, report, Some(allow_list), OutputFormatArg::Github, false);
        assert_eq!(result.unwrap(), 0);
    }

    #[test]
    fn test_fatal_error_is_returned() {
        let temp_dir = TempDir::new().unwrap();
        let (_, report) = write_inputs(&temp_dir, "Rule 8.4");

        let result = run_check(temp_dir.path().join("nope.config"), report, None, OutputFormatArg::Human, false);
        assert!(result.is_err());
    }
}
