//! Deviation config loading for MISRA Gate
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external JSON/YAML formats
//! - Raw deviation records are converted to clean domain sets of rule and directive ids
//! - Malformed records are rejected with the record index instead of being skipped

use crate::domain::violations::{DeviationKind, DeviationRecord, MisraError, MisraResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Structured document formats accepted for config and allow-list files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from the file extension; anything not YAML is read as JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }

    /// Deserialize `content` in this format
    pub fn parse<T: serde::de::DeserializeOwned>(self, content: &str) -> Result<T, String> {
        match self {
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Raw on-disk shape of the deviation config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviationFile {
    /// Null entries are allowed and skipped
    pub deviations: Vec<Option<DeviationEntry>>,
}

/// One element of the `deviations` list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviationEntry {
    /// `"Rule 21.2"` or `"Directive 4.5"`
    #[serde(default)]
    pub deviation: Option<String>,
    /// Free-form justification
    #[serde(default)]
    pub reason: Option<String>,
}

/// Suppressed rule and directive identifiers loaded from a deviation config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviationConfig {
    /// Identifiers of `Rule` deviations
    pub rules: BTreeSet<String>,
    /// Identifiers of `Directive` deviations; collected but never matched
    pub directives: BTreeSet<String>,
}

impl DeviationConfig {
    /// Load the deviation config from a JSON or YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> MisraResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| MisraError::config_read(path, e.to_string()))?;

        Self::load_from_str(&contents, DocumentFormat::from_path(path), path)
    }

    /// Load the deviation config from string content; `origin` is used in error messages
    pub fn load_from_str(
        content: &str,
        format: DocumentFormat,
        origin: impl Into<PathBuf>,
    ) -> MisraResult<Self> {
        let origin = origin.into();
        let file: DeviationFile =
            format.parse(content).map_err(|e| MisraError::config_format(&origin, e))?;

        let config = Self::from_records(parse_records(&file, &origin)?);
        tracing::info!(
            "Loaded {} rule and {} directive deviation(s) from {}",
            config.rules.len(),
            config.directives.len(),
            origin.display()
        );
        Ok(config)
    }

    /// Build the rule/directive sets from parsed records
    pub fn from_records(records: impl IntoIterator<Item = DeviationRecord>) -> Self {
        let mut config = Self::default();
        for record in records {
            match record.kind {
                DeviationKind::Rule => config.rules.insert(record.identifier),
                DeviationKind::Directive => config.directives.insert(record.identifier),
            };
        }
        config
    }

    /// Whether `rule_id` is listed as a `Rule` deviation
    pub fn suppresses_rule(&self, rule_id: &str) -> bool {
        self.rules.contains(rule_id)
    }
}

/// Parse a deviation config file into `(rules, directives)`
pub fn parse<P: AsRef<Path>>(config_path: P) -> MisraResult<(BTreeSet<String>, BTreeSet<String>)> {
    let config = DeviationConfig::load_from_file(config_path)?;
    Ok((config.rules, config.directives))
}

/// Turn every non-null entry that carries a `deviation` string into a record
fn parse_records(file: &DeviationFile, origin: &Path) -> MisraResult<Vec<DeviationRecord>> {
    let mut records = Vec::new();

    for (index, entry) in file.deviations.iter().enumerate() {
        let Some(value) = entry.as_ref().and_then(|e| e.deviation.as_deref()) else {
            tracing::debug!("Skipping empty deviation entry #{}", index);
            continue;
        };

        let record = parse_deviation(value).ok_or_else(|| MisraError::MalformedDeviation {
            path: origin.to_path_buf(),
            index,
            value: value.to_string(),
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Split `"<Kind> <Number>"` into a record.
///
/// Any kind token containing `Rule` is a rule; every other kind is a directive.
pub fn parse_deviation(value: &str) -> Option<DeviationRecord> {
    let mut tokens = value.split_whitespace();
    let (kind, number) = (tokens.next()?, tokens.next()?);
    if tokens.next().is_some() {
        return None;
    }

    let kind = if kind.contains("Rule") { DeviationKind::Rule } else { DeviationKind::Directive };
    Some(DeviationRecord::new(kind, number))
}
