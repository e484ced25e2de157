//! Core domain models for MISRA violations and filtering results
//!
//! Architecture: Rich Domain Models - Violations carry their own ordering and display
//! - ViolationEntry is the value object extracted from one analyzer report line
//! - Classification records which suppression source (if any) accounted for an entry
//! - FilterReport acts as the aggregate root for one filtering run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of a deviation record in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviationKind {
    /// A mechanically checkable MISRA rule
    Rule,
    /// A process or design directive
    Directive,
}

impl DeviationKind {
    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rule => "Rule",
            Self::Directive => "Directive",
        }
    }
}

/// A project-approved deviation, e.g. `Rule 21.2`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviationRecord {
    pub kind: DeviationKind,
    /// The `<major>.<minor>` identifier
    pub identifier: String,
}

impl DeviationRecord {
    pub fn new(kind: DeviationKind, identifier: impl Into<String>) -> Self {
        Self { kind, identifier: identifier.into() }
    }
}

impl fmt::Display for DeviationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.identifier)
    }
}

/// One violation extracted from the analyzer report.
///
/// Field order matters: the derived `Ord` sorts by file, then line
/// (numerically), then rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViolationEntry {
    /// File path exactly as written in the report
    pub file_path: String,
    /// Line number (1-indexed); 0 when the report gave none
    pub line_number: u32,
    /// MISRA rule identifier such as `21.2`
    pub rule_id: String,
}

impl ViolationEntry {
    /// Create a new violation entry
    pub fn new(file_path: impl Into<String>, line_number: u32, rule_id: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            line_number,
            rule_id: rule_id.into(),
        }
    }

    /// Format violation for display
    pub fn format_display(&self) -> String {
        format!("{}:{} [misra-c2012-{}]", self.file_path, self.line_number, self.rule_id)
    }
}

/// Which source, if any, accounted for a reported violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Matched the explicit allow-list
    AllowList,
    /// Rule is listed as a deviation in the config file
    Deviation,
    /// A `coverity[...]` marker sits in the comment block above the line
    Inline,
    /// Not accounted for by anything
    New,
}

impl Classification {
    /// Whether this entry is excluded from the new-violation output
    pub fn is_suppressed(self) -> bool {
        !matches!(self, Self::New)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllowList => "allow_list",
            Self::Deviation => "deviation",
            Self::Inline => "inline",
            Self::New => "new",
        }
    }
}

/// Counts gathered while scanning a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCounts {
    /// Candidate violation records found in the report
    pub records: usize,
    pub suppressed_by_allow_list: usize,
    pub suppressed_by_deviation: usize,
    pub suppressed_inline: usize,
    pub new: usize,
}

impl ScanCounts {
    /// Record one classified entry
    pub fn add(&mut self, classification: Classification) {
        self.records += 1;
        match classification {
            Classification::AllowList => self.suppressed_by_allow_list += 1,
            Classification::Deviation => self.suppressed_by_deviation += 1,
            Classification::Inline => self.suppressed_inline += 1,
            Classification::New => self.new += 1,
        }
    }

    /// Total number of suppressed records across all sources
    pub fn suppressed(&self) -> usize {
        self.suppressed_by_allow_list + self.suppressed_by_deviation + self.suppressed_inline
    }
}

/// Summary statistics for a filtering run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub counts: ScanCounts,
    /// Timestamp when the report was scanned
    pub scanned_at: DateTime<Utc>,
}

/// Result of filtering one analyzer report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterReport {
    /// New violations, in report order until sorted
    pub violations: Vec<ViolationEntry>,
    pub summary: ScanSummary,
}

impl FilterReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            summary: ScanSummary {
                scanned_at: Utc::now(),
                ..Default::default()
            },
        }
    }

    /// Record a classified entry, keeping it only when it is new
    pub fn record(&mut self, entry: ViolationEntry, classification: Classification) {
        self.summary.counts.add(classification);
        if !classification.is_suppressed() {
            self.violations.push(entry);
        }
    }

    /// Whether the run found anything not accounted for
    pub fn has_new_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Sort violations by file, line and rule for presentation.
    ///
    /// Line numbers compare numerically (9 before 10), not as text.
    pub fn sort_violations(&mut self) {
        self.violations.sort();
    }
}

impl Default for FilterReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types that can occur while filtering
#[derive(Debug, thiserror::Error)]
pub enum MisraError {
    /// Deviation config could not be read
    #[error("Failed to read config file '{}': {message}", .path.display())]
    ConfigRead { path: PathBuf, message: String },

    /// Deviation config is not a document with a `deviations` list
    #[error("Invalid config file '{}': {message}", .path.display())]
    ConfigFormat { path: PathBuf, message: String },

    /// A `deviation` string is not `<Kind> <Number>`
    #[error(
        "Malformed deviation #{index} in '{}': expected '<Rule|Directive> <number>', found '{value}'",
        .path.display()
    )]
    MalformedDeviation { path: PathBuf, index: usize, value: String },

    /// Analyzer report could not be read
    #[error("Failed to read report '{}': {source}", .path.display())]
    ReportRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file named by the report could not be read
    #[error("Failed to read source file '{}': {source}", .path.display())]
    SourceFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Allow-list file could not be loaded
    #[error("Allow-list error in '{}': {message}", .path.display())]
    AllowList { path: PathBuf, message: String },

    /// Writing output failed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Rendering the report failed
    #[error("Output error: {message}")]
    Output { message: String },
}

impl MisraError {
    /// Create a config read error
    pub fn config_read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a config format error
    pub fn config_format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an allow-list error
    pub fn allow_list(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::AllowList {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }
}

/// Result type for filtering operations
pub type MisraResult<T> = Result<T, MisraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_ordering_is_numeric_on_lines() {
        let mut entries = vec![
            ViolationEntry::new("b.c", 1, "8.4"),
            ViolationEntry::new("a.c", 10, "21.2"),
            ViolationEntry::new("a.c", 9, "21.2"),
            ViolationEntry::new("a.c", 9, "11.3"),
        ];
        entries.sort();

        assert_eq!(
            entries,
            vec![
                ViolationEntry::new("a.c", 9, "11.3"),
                ViolationEntry::new("a.c", 9, "21.2"),
                ViolationEntry::new("a.c", 10, "21.2"),
                ViolationEntry::new("b.c", 1, "8.4"),
            ]
        );
    }

    #[test]
    fn test_filter_report_keeps_only_new_entries() {
        let mut report = FilterReport::new();
        report.record(ViolationEntry::new("a.c", 5, "21.2"), Classification::Deviation);
        report.record(ViolationEntry::new("a.c", 7, "11.3"), Classification::Inline);
        report.record(ViolationEntry::new("b.c", 2, "12.3"), Classification::AllowList);
        report.record(ViolationEntry::new("b.c", 3, "8.4"), Classification::New);

        assert!(report.has_new_violations());
        assert_eq!(report.violations, vec![ViolationEntry::new("b.c", 3, "8.4")]);
        assert_eq!(report.summary.counts.records, 4);
        assert_eq!(report.summary.counts.suppressed(), 3);
        assert_eq!(report.summary.counts.new, 1);
    }

    #[test]
    fn test_classification_suppression() {
        assert!(Classification::AllowList.is_suppressed());
        assert!(Classification::Deviation.is_suppressed());
        assert!(Classification::Inline.is_suppressed());
        assert!(!Classification::New.is_suppressed());
    }

    #[test]
    fn test_deviation_record_display() {
        let record = DeviationRecord::new(DeviationKind::Directive, "4.5");
        assert_eq!(record.to_string(), "Directive 4.5");
    }

    #[test]
    fn test_error_messages_name_the_file() {
        let err = MisraError::MalformedDeviation {
            path: PathBuf::from("misra.config"),
            index: 3,
            value: "Rule".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("misra.config"));
        assert!(message.contains("#3"));
    }
}
