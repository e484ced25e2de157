//! Parsing of cppcheck MISRA addon report lines
//!
//! A violation record looks like:
//!
//! ```text
//! [FreeRTOS_ARP.c:1] (style) misra violation (use --rule-texts=<file> to get proper output) (Undefined) [misra-c2012-3.1]
//! ```
//!
//! Grammar, after trimming leading whitespace:
//! `'['? <file> ':' <digits>? <anything> 'misra-c2012-' <rule> (']' <anything>)?`
//! where `<file>` holds no `:` and the LAST `misra-c2012-` names the rule.

use crate::domain::violations::ViolationEntry;

/// Marker present on every violation record
pub const RULE_TEXTS_MARKER: &str = "use --rule-texts";

/// Prefix of the rule tag at the end of a record
pub const RULE_PREFIX: &str = "misra-c2012-";

/// Whether `line` is a violation record rather than a diagnostic or summary line
pub fn is_violation_record(line: &str) -> bool {
    line.contains(RULE_TEXTS_MARKER) && line.contains(RULE_PREFIX)
}

/// Extract `(file, line, rule)` from a report line; `None` for non-records
pub fn parse_report_line(line: &str) -> Option<ViolationEntry> {
    if !is_violation_record(line) {
        return None;
    }

    let record = line.trim_start();
    let record = record.strip_prefix('[').unwrap_or(record);

    let (file_path, after_colon) = record.split_once(':').unwrap_or((record, ""));
    let line_number = leading_number(after_colon);
    if line_number == 0 {
        tracing::warn!("No line number in report record for '{}'", file_path);
    }

    let rule_start = line.rfind(RULE_PREFIX)? + RULE_PREFIX.len();
    let rule_tail = &line[rule_start..];
    let rule_id = rule_tail.split(']').next().unwrap_or(rule_tail).trim_end();

    Some(ViolationEntry::new(file_path, line_number, rule_id))
}

/// Value of the run of ASCII digits at the start of `text`; 0 if none or on overflow
fn leading_number(text: &str) -> u32 {
    let digits = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    text[..digits].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "[FreeRTOS_ARP.c:1] (style) misra violation (use --rule-texts=<file> to get proper output) (Undefined) [misra-c2012-3.1]",
        "FreeRTOS_ARP.c", 1, "3.1"
    )]
    #[case(
        "[source/FreeRTOS_IP.c:1234] (style) misra violation (use --rule-texts=<file> to get proper output) [misra-c2012-21.15]\n",
        "source/FreeRTOS_IP.c", 1234, "21.15"
    )]
    #[case(
        "  [a.c:5] (use --rule-texts=x) [misra-c2012-8.4] trailing [misra-c2012-21.2]",
        "a.c", 5, "21.2"
    )]
    #[case("[a.c:] (use --rule-texts=x) [misra-c2012-8.4]", "a.c", 0, "8.4")]
    #[case("[a.c:12abc] (use --rule-texts=x) [misra-c2012-10.1]", "a.c", 12, "10.1")]
    #[case("[a.c:99999999999] (use --rule-texts=x) [misra-c2012-10.1]", "a.c", 0, "10.1")]
    #[case("[a.c:7] (use --rule-texts=x) misra-c2012-17.7  \n", "a.c", 7, "17.7")]
    fn test_parse_record(#[case] line: &str, #[case] file: &str, #[case] number: u32, #[case] rule: &str) {
        assert_eq!(parse_report_line(line), Some(ViolationEntry::new(file, number, rule)));
    }

    #[rstest]
    #[case("")]
    #[case("Checking FreeRTOS_ARP.c ...")]
    #[case("[a.c:5] (style) misra violation [misra-c2012-21.2]")]
    #[case("[a.c:5] (style) something (use --rule-texts=x) [cert-int31-c]")]
    #[case("nofmt: The following MISRA rules were violated")]
    fn test_non_records_are_ignored(#[case] line: &str) {
        assert_eq!(parse_report_line(line), None);
    }
}
