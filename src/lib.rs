//! MISRA Gate - only new MISRA C:2012 violations fail the build
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Pure classification logic separated from report, config and source file I/O
//! - Three suppression sources: config deviations, inline markers, an explicit allow-list
//! - The CLI is a thin wrapper over `ViolationFilter`

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod domain;
pub mod report;
pub mod suppression;

// Re-export main types for convenient access
pub use domain::violations::{
    Classification, DeviationKind, DeviationRecord, FilterReport, MisraError, MisraResult,
    ScanCounts, ScanSummary, ViolationEntry,
};

pub use config::{DeviationConfig, DocumentFormat};

pub use analyzer::{find_new_violations, Analyzer};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use cache::{CacheStatistics, SourceCache};

pub use suppression::{AllowEntry, AllowList, AllowListBuilder, LineSelector};

use std::path::Path;

/// Main filter providing high-level operations
pub struct ViolationFilter {
    analyzer: Analyzer,
    report_formatter: ReportFormatter,
}

impl ViolationFilter {
    /// Create a filter from loaded deviations, with no allow-list
    pub fn new(deviations: DeviationConfig) -> Self {
        Self {
            analyzer: Analyzer::new(deviations, None),
            report_formatter: ReportFormatter::default(),
        }
    }

    /// Create a filter loading deviations from a config file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> MisraResult<Self> {
        let deviations = DeviationConfig::load_from_file(path)?;
        Ok(Self::new(deviations))
    }

    /// Add an explicit allow-list
    pub fn with_allow_list(mut self, allow_list: AllowList) -> Self {
        self.analyzer = self.analyzer.with_allow_list(allow_list);
        self
    }

    /// Add an allow-list loaded from a JSON or YAML file
    pub fn with_allow_list_file<P: AsRef<Path>>(self, path: P) -> MisraResult<Self> {
        let allow_list = AllowList::load_from_file(path)?;
        Ok(self.with_allow_list(allow_list))
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn deviations(&self) -> &DeviationConfig {
        self.analyzer.deviations()
    }

    pub fn allow_list(&self) -> Option<&AllowList> {
        self.analyzer.allow_list()
    }

    /// Scan a report and return its new violations sorted by file, line and rule
    pub fn filter_report<P: AsRef<Path>>(&self, report_path: P) -> MisraResult<FilterReport> {
        let mut report = self.analyzer.scan_file(report_path)?;
        report.sort_violations();
        Ok(report)
    }

    /// Decide whether one violation is accounted for, reading its source file if needed
    pub fn classify(&self, entry: &ViolationEntry) -> MisraResult<Classification> {
        self.analyzer.classify(entry, &mut SourceCache::new())
    }

    /// Format a filter report for output
    pub fn format_report(&self, report: &FilterReport, format: OutputFormat) -> MisraResult<String> {
        self.report_formatter.format_report(report, format)
    }
}

/// Convenience function: load the config and filter one report
pub fn filter_report<C: AsRef<Path>, R: AsRef<Path>>(
    config_path: C,
    report_path: R,
) -> MisraResult<FilterReport> {
    ViolationFilter::from_config_file(config_path)?.filter_report(report_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            Self { dir: TempDir::new().unwrap() }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }

        fn source(&self, name: &str) -> String {
            self.dir.path().join(name).display().to_string()
        }

        fn report_line(&self, name: &str, line: u32, rule: &str) -> String {
            format!(
                "[{}:{line}] (style) misra violation (use --rule-texts=<file> to get proper output) (Undefined) [misra-c2012-{rule}]\n",
                self.source(name)
            )
        }
    }

    const A_C: &str = "#include <stdlib.h>\n\nint a;\nint b = a;\nvoid * p = malloc( 4 );\n";

    #[test]
    fn test_deviation_in_config_means_no_new_violations() {
        let ws = Workspace::new();
        ws.write("a.c", A_C);
        let config = ws.write("misra.config", r#"{ "deviations": [ { "deviation": "Rule 21.2" } ] }"#);
        let report = ws.write("misra.md", &ws.report_line("a.c", 5, "21.2"));

        let result = filter_report(&config, &report).unwrap();

        assert!(!result.has_new_violations());
        assert_eq!(result.summary.counts.suppressed_by_deviation, 1);
    }

    #[test]
    fn test_unmatched_violation_is_reported() {
        let ws = Workspace::new();
        ws.write("a.c", A_C);
        let config = ws.write("misra.config", r#"{ "deviations": [ { "deviation": "Directive 21.2" } ] }"#);
        let report = ws.write("misra.md", &ws.report_line("a.c", 5, "21.2"));

        let result = filter_report(&config, &report).unwrap();

        assert_eq!(result.violations, vec![ViolationEntry::new(ws.source("a.c"), 5, "21.2")]);
    }

    #[test]
    fn test_all_three_sources_together() {
        let ws = Workspace::new();
        ws.write(
            "ip.c",
            "int x;\n/* coverity[misra_c_2012_rule_11_3_violation] */\np = ( uint8_t * ) q;\nprintf( \"x\" );\nint y;\n",
        );
        let config = ws.write("misra.yaml", "deviations:\n  - deviation: Rule 8.7\n  - ~\n");
        let allow = ws.write(
            "allow.json",
            &format!(r#"{{ "12.3": ["*"], "{}": {{ "21.6": ["4"] }} }}"#, ws.source("ip.c")),
        );
        let content = [
            ws.report_line("ip.c", 3, "11.3"),
            ws.report_line("ip.c", 4, "21.6"),
            ws.report_line("ip.c", 5, "12.3"),
            ws.report_line("ip.c", 5, "8.7"),
            ws.report_line("ip.c", 5, "21.6"),
            ws.report_line("ip.c", 1, "8.4"),
            "nofmt: unrelated diagnostic\n".to_string(),
        ]
        .concat();
        let report = ws.write("misra.md", &content);

        let filter = ViolationFilter::from_config_file(&config)
            .unwrap()
            .with_allow_list_file(&allow)
            .unwrap();
        let result = filter.filter_report(&report).unwrap();

        assert_eq!(
            result.violations,
            vec![
                ViolationEntry::new(ws.source("ip.c"), 1, "8.4"),
                ViolationEntry::new(ws.source("ip.c"), 5, "21.6"),
            ]
        );
        let counts = &result.summary.counts;
        assert_eq!(counts.records, 6);
        assert_eq!(counts.suppressed_by_allow_list, 2);
        assert_eq!(counts.suppressed_by_deviation, 1);
        assert_eq!(counts.suppressed_inline, 1);
    }

    #[test]
    fn test_repeated_runs_match() {
        let ws = Workspace::new();
        ws.write("a.c", A_C);
        let config = ws.write("misra.config", r#"{ "deviations": [] }"#);
        let content = [ws.report_line("a.c", 5, "21.3"), ws.report_line("a.c", 2, "20.1")].concat();
        let report = ws.write("misra.md", &content);

        let filter = ViolationFilter::from_config_file(&config).unwrap();
        let first = filter.filter_report(&report).unwrap();
        let second = filter.filter_report(&report).unwrap();

        assert_eq!(first.violations, second.violations);
        assert_eq!(first.violations[0].line_number, 2);
    }

    #[test]
    fn test_edited_source_is_reread_between_runs() {
        let ws = Workspace::new();
        ws.write("a.c", A_C);
        let config = ws.write("misra.config", r#"{ "deviations": [] }"#);
        let report = ws.write("misra.md", &ws.report_line("a.c", 2, "20.1"));
        let filter = ViolationFilter::from_config_file(&config).unwrap();

        assert!(filter.filter_report(&report).unwrap().has_new_violations());

        ws.write("a.c", "/* coverity[misra_c_2012_rule_20_1_violation] */\n#include <stdlib.h>\n");
        assert!(!filter.filter_report(&report).unwrap().has_new_violations());
    }

    #[test]
    fn test_classify_single_entry() {
        let ws = Workspace::new();
        ws.write("a.c", A_C);
        let filter = ViolationFilter::new(DeviationConfig::default())
            .with_allow_list(AllowList::builder().allow_rule("12.3").build().unwrap());

        let allowed = ViolationEntry::new(ws.source("a.c"), 3, "12.3");
        let fresh = ViolationEntry::new(ws.source("a.c"), 3, "12.4");

        assert_eq!(filter.classify(&allowed).unwrap(), Classification::AllowList);
        assert_eq!(filter.classify(&fresh).unwrap(), Classification::New);
    }

    #[test]
    fn test_fatal_errors_surface() {
        let ws = Workspace::new();
        let config = ws.write("misra.config", r#"{ "deviations": [] }"#);

        assert!(matches!(
            filter_report(ws.dir.path().join("absent.config"), &config),
            Err(MisraError::ConfigRead { .. })
        ));
        assert!(matches!(
            filter_report(&config, ws.dir.path().join("absent.md")),
            Err(MisraError::ReportRead { .. })
        ));
    }
}
