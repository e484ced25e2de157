//! Inline suppression markers in C sources
//!
//! Architectural Principle: Service Layer - suppression lookups are pure functions over loaded lines
//! - The backward scan walks the contiguous `/*` comment block above a reported line
//! - Markers look like `/* coverity[misra_c_2012_rule_11_3_violation] */`
//! - Explicit allow-list exemptions live in the `allow_list` submodule

pub mod allow_list;

use crate::cache::SourceCache;
use crate::domain::violations::MisraResult;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

pub use allow_list::{AllowEntry, AllowList, AllowListBuilder, LineSelector};

lazy_static! {
    static ref MARKER: Regex = Regex::new(r"coverity\[misra_c_2012_rule_(\d+)_(\d+)_violation\]")
        .expect("inline marker pattern is valid");
}

const COMMENT_OPENER: &str = "/*";

/// Rule identifiers (`11.3`) named by every marker on `line`
pub fn marker_rules(line: &str) -> impl Iterator<Item = String> + '_ {
    MARKER
        .captures_iter(line)
        .map(|caps| format!("{}.{}", &caps[1], &caps[2]))
}

/// Whether the comment block directly above `line_number` suppresses `rule_id`.
///
/// `lines` holds the whole file; `line_number` is 1-based. The walk starts on the
/// line above and stops at the first line that does not open a `/*` comment, at
/// the start of the file, or past its end.
pub fn has_inline_suppression<S: AsRef<str>>(lines: &[S], line_number: u32, rule_id: &str) -> bool {
    let mut current = line_number.saturating_sub(1) as usize;

    while current >= 1 {
        let Some(line) = lines.get(current - 1) else {
            break;
        };

        if !line.as_ref().trim_start().starts_with(COMMENT_OPENER) {
            break;
        }

        if marker_rules(line.as_ref()).any(|rule| rule == rule_id) {
            tracing::debug!("Inline marker for rule {} found on line {}", rule_id, current);
            return true;
        }

        current -= 1;
    }

    false
}

/// Read `file_path` and check it for an inline suppression of `rule_id` above `line_number`
pub fn is_suppressed<P: AsRef<Path>>(file_path: P, line_number: u32, rule_id: &str) -> MisraResult<bool> {
    let mut cache = SourceCache::new();
    is_suppressed_cached(&mut cache, file_path, line_number, rule_id)
}

/// Same as [`is_suppressed`], reading the file through a per-run cache
pub fn is_suppressed_cached<P: AsRef<Path>>(
    cache: &mut SourceCache,
    file_path: P,
    line_number: u32,
    rule_id: &str,
) -> MisraResult<bool> {
    let lines = cache.lines(file_path.as_ref())?;
    Ok(has_inline_suppression(lines, line_number, rule_id))
}
