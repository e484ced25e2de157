//! Report generation with multiple output formats
//!
//! CDD Principle: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - FilterReport (domain) is converted to a table, JSON or CI annotations
//! - Each formatter encapsulates the rules for its specific output format

use crate::domain::violations::{FilterReport, MisraError, MisraResult, ViolationEntry};
use std::io::Write;

const HEADERS: [&str; 3] = ["File name", "Line number", "MISRA rule number"];

/// Supported output formats for filter reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Count line plus an aligned table
    Human,
    /// JSON format for programmatic consumption
    Json,
    /// GitHub Actions format for workflow integration
    GitHub,
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (for human format)
    pub use_colors: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

/// Main report formatter that dispatches to specific formatters
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    /// Create a new report formatter with options
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    /// Format a filter report in the specified format
    pub fn format_report(&self, report: &FilterReport, format: OutputFormat) -> MisraResult<String> {
        match format {
            OutputFormat::Human => Ok(self.format_human(report)),
            OutputFormat::Json => self.format_json(report),
            OutputFormat::GitHub => Ok(self.format_github(report)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &FilterReport,
        format: OutputFormat,
        mut writer: W,
    ) -> MisraResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    /// Count line, then the violation table when there is anything to show
    fn format_human(&self, report: &FilterReport) -> String {
        let count = report.violations.len();
        let mut output = String::new();

        if self.options.use_colors {
            let color = if count == 0 { "32" } else { "31" };
            output.push_str(&format!(
                "Total new violation(s) introduced: \x1b[{color}m{count}\x1b[0m\n"
            ));
        } else {
            output.push_str(&format!("Total new violation(s) introduced: {count}\n"));
        }

        if count > 0 {
            output.push_str(&self.format_table(&report.violations));
        }

        output
    }

    /// Three-column table; file names left-aligned, numbers centered
    fn format_table(&self, violations: &[ViolationEntry]) -> String {
        let rows: Vec<[String; 3]> = violations
            .iter()
            .map(|v| [v.file_path.clone(), v.line_number.to_string(), v.rule_id.clone()])
            .collect();

        let mut widths = HEADERS.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut table = String::new();

        let header = render_row(&HEADERS, &widths);
        if self.options.use_colors {
            table.push_str(&format!("\x1b[1m{header}\x1b[0m\n"));
        } else {
            table.push_str(&header);
            table.push('\n');
        }

        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        table.push_str(&rule.join("  "));
        table.push('\n');

        for row in &rows {
            table.push_str(&render_row(row, &widths));
            table.push('\n');
        }

        table
    }

    /// Format report in JSON format
    fn format_json(&self, report: &FilterReport) -> MisraResult<String> {
        let counts = &report.summary.counts;
        let json_report = serde_json::json!({
            "new_violations": report.violations,
            "summary": {
                "records": counts.records,
                "new": counts.new,
                "suppressed": {
                    "allow_list": counts.suppressed_by_allow_list,
                    "deviation": counts.suppressed_by_deviation,
                    "inline": counts.suppressed_inline
                },
                "scanned_at": report.summary.scanned_at.to_rfc3339()
            }
        });

        serde_json::to_string_pretty(&json_report)
            .map(|mut json| {
                json.push('\n');
                json
            })
            .map_err(|e| MisraError::output(format!("JSON serialization failed: {e}")))
    }

    /// Format report for GitHub Actions
    fn format_github(&self, report: &FilterReport) -> String {
        let mut output = String::new();

        for violation in &report.violations {
            let position = if violation.line_number > 0 {
                format!(",line={}", violation.line_number)
            } else {
                String::new()
            };

            output.push_str(&format!(
                "::error file={}{},title=MISRA C:2012 rule {}::New violation of MISRA C:2012 rule {}\n",
                violation.file_path, position, violation.rule_id, violation.rule_id
            ));
        }

        output
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(ReportOptions::default())
    }
}

fn render_row<S: AsRef<str>>(cells: &[S], widths: &[usize; 3]) -> String {
    let cells: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(column, (cell, &width))| {
            if column == 0 {
                format!("{:<width$}", cell.as_ref())
            } else {
                format!("{:^width$}", cell.as_ref())
            }
        })
        .collect();

    cells.join("  ").trim_end().to_string()
}
