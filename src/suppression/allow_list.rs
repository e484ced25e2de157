//! Explicit allow-list of accepted violations
//!
//! Architectural Principle: Service Layer - AllowList answers one question: is this violation exempt?
//! - Top-level keys are either rule ids (`"12.3": ["*"]`) or file paths
//!   (`"f.c": { "21.6": ["35"], "11.8": ["*"] }`)
//! - Each key holds a tagged `AllowEntry` so the two readings never share a namespace

use crate::config::DocumentFormat;
use crate::domain::violations::{MisraError, MisraResult};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Wildcard token meaning "every line"
pub const WILDCARD: &str = "*";

/// A line number or the `"*"` wildcard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSelector", into = "String")]
pub enum LineSelector {
    Any,
    Line(u32),
}

/// Selectors may be written as strings (`"35"`, `"*"`) or bare integers
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelector {
    Number(u64),
    Text(String),
}

impl TryFrom<RawSelector> for LineSelector {
    type Error = String;

    fn try_from(raw: RawSelector) -> Result<Self, Self::Error> {
        match raw {
            RawSelector::Number(n) => u32::try_from(n)
                .map(Self::Line)
                .map_err(|_| format!("line number {n} is out of range")),
            RawSelector::Text(text) => text.parse(),
        }
    }
}

impl std::str::FromStr for LineSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == WILDCARD {
            return Ok(Self::Any);
        }
        s.parse::<u32>()
            .map(Self::Line)
            .map_err(|_| format!("expected a line number or \"{WILDCARD}\", found '{s}'"))
    }
}

impl fmt::Display for LineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(WILDCARD),
            Self::Line(line) => write!(f, "{line}"),
        }
    }
}

impl From<LineSelector> for String {
    fn from(selector: LineSelector) -> Self {
        selector.to_string()
    }
}

/// Interpretation of one top-level allow-list key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AllowEntry {
    /// Key is a rule id; only `"*"` has an effect
    Rule(Vec<LineSelector>),
    /// Key is a file path; maps rule ids to exempt lines
    File(BTreeMap<String, Vec<LineSelector>>),
}

// Nested rule keys are read as written: unquoted YAML `8.10` is rule "8.10".
impl<'de> Deserialize<'de> for AllowEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AllowEntryVisitor)
    }
}

struct AllowEntryVisitor;

impl<'de> Visitor<'de> for AllowEntryVisitor {
    type Value = AllowEntry;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a list of line selectors or a map of rule ids to line selectors")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut selectors = Vec::new();
        while let Some(selector) = seq.next_element()? {
            selectors.push(selector);
        }
        Ok(AllowEntry::Rule(selectors))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut rules = BTreeMap::new();
        while let Some(rule_id) = map.next_key::<String>()? {
            let selectors = map
                .next_value::<Vec<LineSelector>>()
                .map_err(|e| <A::Error as de::Error>::custom(format!("rule '{rule_id}': {e}")))?;
            rules.insert(rule_id, selectors);
        }
        Ok(AllowEntry::File(rules))
    }
}

/// Why an allow-list lookup succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowListMatch {
    /// `file -> rule -> [line]`
    Line,
    /// `file -> rule -> ["*"]`
    WholeFile,
    /// `rule -> ["*"]`
    Global,
}

/// Static map of explicit exemptions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    entries: BTreeMap<String, AllowEntry>,
}

impl AllowList {
    /// An allow-list with no entries
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building an allow-list programmatically
    pub fn builder() -> AllowListBuilder {
        AllowListBuilder::default()
    }

    /// Load an allow-list from a JSON or YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> MisraResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| MisraError::allow_list(path, format!("failed to read file: {e}")))?;

        Self::load_from_str(&contents, DocumentFormat::from_path(path), path)
    }

    /// Load an allow-list from string content; `origin` is used in error messages
    pub fn load_from_str(
        content: &str,
        format: DocumentFormat,
        origin: impl Into<PathBuf>,
    ) -> MisraResult<Self> {
        let origin = origin.into();
        let list: Self = format.parse(content).map_err(|e| MisraError::allow_list(&origin, e))?;

        for (key, entry) in &list.entries {
            if let AllowEntry::Rule(selectors) = entry {
                if !selectors.contains(&LineSelector::Any) {
                    tracing::warn!(
                        "Allow-list entry '{}' in {} lists lines without a file and has no effect",
                        key,
                        origin.display()
                    );
                }
            }
        }

        tracing::info!("Loaded {} allow-list entries from {}", list.len(), origin.display());
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a top-level key
    pub fn entry(&self, key: &str) -> Option<&AllowEntry> {
        self.entries.get(key)
    }

    /// Whether the violation is exempt
    pub fn matches(&self, file_path: &str, rule_id: &str, line_number: u32) -> bool {
        self.find_match(file_path, rule_id, line_number).is_some()
    }

    /// Check, in order: exact line, whole-file wildcard, global rule wildcard
    pub fn find_match(&self, file_path: &str, rule_id: &str, line_number: u32) -> Option<AllowListMatch> {
        if let Some(AllowEntry::File(rules)) = self.entries.get(file_path) {
            if let Some(selectors) = rules.get(rule_id) {
                if selectors.contains(&LineSelector::Line(line_number)) {
                    return Some(AllowListMatch::Line);
                }
                if selectors.contains(&LineSelector::Any) {
                    return Some(AllowListMatch::WholeFile);
                }
            }
        }

        match self.entries.get(rule_id) {
            Some(AllowEntry::Rule(selectors)) if selectors.contains(&LineSelector::Any) => {
                Some(AllowListMatch::Global)
            }
            _ => None,
        }
    }
}

/// Match against an optional allow-list; an absent list never matches
pub fn matches(allow_list: Option<&AllowList>, file_path: &str, rule_id: &str, line_number: u32) -> bool {
    allow_list.is_some_and(|list| list.matches(file_path, rule_id, line_number))
}

/// Builder for compiled-in allow-lists
#[derive(Debug, Default)]
pub struct AllowListBuilder {
    global_rules: BTreeSet<String>,
    files: BTreeMap<String, BTreeMap<String, Vec<LineSelector>>>,
}

impl AllowListBuilder {
    /// Exempt a rule everywhere
    pub fn allow_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.global_rules.insert(rule_id.into());
        self
    }

    /// Exempt a rule on specific lines of one file
    pub fn allow_lines(
        mut self,
        file_path: impl Into<String>,
        rule_id: impl Into<String>,
        lines: impl IntoIterator<Item = u32>,
    ) -> Self {
        self.selectors(file_path.into(), rule_id.into())
            .extend(lines.into_iter().map(LineSelector::Line));
        self
    }

    /// Exempt a rule throughout one file
    pub fn allow_file(mut self, file_path: impl Into<String>, rule_id: impl Into<String>) -> Self {
        self.selectors(file_path.into(), rule_id.into()).push(LineSelector::Any);
        self
    }

    fn selectors(&mut self, file_path: String, rule_id: String) -> &mut Vec<LineSelector> {
        self.files.entry(file_path).or_default().entry(rule_id).or_default()
    }

    /// Build the allow-list, rejecting keys used both as a rule and as a file
    pub fn build(self) -> MisraResult<AllowList> {
        if let Some(key) = self.global_rules.iter().find(|rule| self.files.contains_key(*rule)) {
            return Err(MisraError::allow_list(
                "<builder>",
                format!("'{key}' is used both as a global rule and as a file path"),
            ));
        }

        let mut entries: BTreeMap<String, AllowEntry> = self
            .files
            .into_iter()
            .map(|(file, rules)| (file, AllowEntry::File(rules)))
            .collect();
        for rule in self.global_rules {
            entries.insert(rule, AllowEntry::Rule(vec![LineSelector::Any]));
        }

        Ok(AllowList { entries })
    }
}
