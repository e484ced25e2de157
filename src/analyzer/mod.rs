//! Report scanning and violation classification for MISRA Gate
//!
//! CDD Principle: Domain Services - Analyzer orchestrates the suppression sources
//! - Streams the analyzer report and extracts one ViolationEntry per record
//! - Applies allow-list, config deviations and inline markers in that order
//! - Collects the entries nothing accounted for, in report order

pub mod report_line;

use crate::cache::SourceCache;
use crate::config::DeviationConfig;
use crate::domain::violations::{
    Classification, FilterReport, MisraError, MisraResult, ViolationEntry,
};
use crate::suppression::{self, AllowList};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub use report_line::{is_violation_record, parse_report_line};

/// Classifies every violation in an analyzer report
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    deviations: DeviationConfig,
    allow_list: Option<AllowList>,
}

impl Analyzer {
    /// Create an analyzer from loaded deviations and an optional allow-list
    pub fn new(deviations: DeviationConfig, allow_list: Option<AllowList>) -> Self {
        if !deviations.directives.is_empty() {
            tracing::debug!(
                "{} directive deviation(s) loaded; directives are not matched against reports",
                deviations.directives.len()
            );
        }
        Self { deviations, allow_list }
    }

    /// Replace the allow-list
    pub fn with_allow_list(mut self, allow_list: AllowList) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    pub fn deviations(&self) -> &DeviationConfig {
        &self.deviations
    }

    pub fn allow_list(&self) -> Option<&AllowList> {
        self.allow_list.as_ref()
    }

    /// Decide whether `entry` is already accounted for
    pub fn classify(&self, entry: &ViolationEntry, cache: &mut SourceCache) -> MisraResult<Classification> {
        classify(entry, self.allow_list.as_ref(), &self.deviations.rules, cache)
    }

    /// Scan a report file
    pub fn scan_file<P: AsRef<Path>>(&self, report_path: P) -> MisraResult<FilterReport> {
        let report_path = report_path.as_ref();
        let file = File::open(report_path).map_err(|source| MisraError::ReportRead {
            path: report_path.to_path_buf(),
            source,
        })?;

        self.scan(BufReader::new(file), report_path)
    }

    /// Scan report content from any reader; `origin` names it in errors.
    ///
    /// A fresh source cache is used for every call.
    pub fn scan<R: BufRead>(&self, reader: R, origin: &Path) -> MisraResult<FilterReport> {
        let mut cache = SourceCache::new();
        let mut report = FilterReport::new();

        for_each_entry(reader, origin, |entry| {
            let classification = self.classify(&entry, &mut cache)?;
            tracing::debug!("{} -> {}", entry.format_display(), classification.as_str());
            report.record(entry, classification);
            Ok(())
        })?;

        let counts = &report.summary.counts;
        tracing::info!(
            "Scanned {} record(s): {} suppressed, {} new",
            counts.records,
            counts.suppressed(),
            counts.new
        );
        tracing::debug!("{}", cache.statistics().format_display());

        Ok(report)
    }
}

/// Classify one entry: allow-list, then config rule deviations, then inline markers
pub fn classify(
    entry: &ViolationEntry,
    allow_list: Option<&AllowList>,
    suppressed_rules: &BTreeSet<String>,
    cache: &mut SourceCache,
) -> MisraResult<Classification> {
    if suppression::allow_list::matches(allow_list, &entry.file_path, &entry.rule_id, entry.line_number) {
        return Ok(Classification::AllowList);
    }

    if suppressed_rules.contains(&entry.rule_id) {
        return Ok(Classification::Deviation);
    }

    if suppression::is_suppressed_cached(cache, &entry.file_path, entry.line_number, &entry.rule_id)? {
        return Ok(Classification::Inline);
    }

    Ok(Classification::New)
}

/// Violations in `report_path` not suppressed by any source, in report order
pub fn find_new_violations<P: AsRef<Path>>(
    report_path: P,
    allow_list: Option<&AllowList>,
    suppressed_rules: &BTreeSet<String>,
) -> MisraResult<Vec<ViolationEntry>> {
    let deviations = DeviationConfig {
        rules: suppressed_rules.clone(),
        ..DeviationConfig::default()
    };
    let analyzer = Analyzer::new(deviations, allow_list.cloned());

    Ok(analyzer.scan_file(report_path)?.violations)
}

/// Feed every violation record of the report to `handle`, stopping at the first error.
///
/// Lines are decoded lossily so stray non-UTF-8 bytes in diagnostics do not abort a scan.
fn for_each_entry<R, F>(mut reader: R, origin: &Path, mut handle: F) -> MisraResult<()>
where
    R: BufRead,
    F: FnMut(ViolationEntry) -> MisraResult<()>,
{
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        let read = reader.read_until(b'\n', &mut buffer).map_err(|source| MisraError::ReportRead {
            path: origin.to_path_buf(),
            source,
        })?;
        if read == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buffer);
        if let Some(entry) = parse_report_line(&line) {
            handle(entry)?;
        }
    }

    Ok(())
}
