//! Deterministic date normalization — spec.md §4.1 "Date rules".
//!
//! Pure function, no I/O. Rules are applied top to bottom; first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::normalized::{confidence, DateMethod, NormalizedDate};

static RULE1_EXACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());
static RULE2_BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[(\d{4})\]$").unwrap());
static RULE3_CIRCA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^c\.?\s*(\d{4})$").unwrap());
static RULE4_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{4})$").unwrap());
static RULE5_EMBEDDED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})").unwrap());

/// Normalize a raw MARC imprint date string. `evidence_paths` should contain
/// the `source_path` of the [`crate::model::SourcedValue`] this date came
/// from; it is threaded through unchanged.
pub fn normalize_date(raw: Option<&str>, evidence_paths: Vec<String>) -> NormalizedDate {
    let raw = match raw {
        None => "",
        Some(s) => s,
    };
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return NormalizedDate {
            start: None,
            end: None,
            label: String::new(),
            confidence: confidence::UNPARSED_OR_MISSING,
            method: DateMethod::Missing,
            evidence_paths,
            warnings: Vec::new(),
        };
    }

    // Rule 1: exact 4-digit year.
    if RULE1_EXACT.is_match(trimmed) {
        let year: i32 = trimmed.parse().unwrap();
        return NormalizedDate {
            start: Some(year),
            end: Some(year),
            label: trimmed.to_string(),
            confidence: confidence::YEAR_EXACT,
            method: DateMethod::YearExact,
            evidence_paths,
            warnings: Vec::new(),
        };
    }

    // Rule 2: bracketed year, e.g. "[1680]".
    if let Some(caps) = RULE2_BRACKETED.captures(trimmed) {
        let year: i32 = caps[1].parse().unwrap();
        return NormalizedDate {
            start: Some(year),
            end: Some(year),
            label: trimmed.to_string(),
            confidence: confidence::YEAR_BRACKETED,
            method: DateMethod::YearBracketed,
            evidence_paths,
            warnings: Vec::new(),
        };
    }

    // Rule 3: circa, e.g. "c.1680" / "c 1680" -> year +/- 5.
    if let Some(caps) = RULE3_CIRCA.captures(trimmed) {
        let year: i32 = caps[1].parse().unwrap();
        return NormalizedDate {
            start: Some(year - 5),
            end: Some(year + 5),
            label: trimmed.to_string(),
            confidence: confidence::YEAR_CIRCA_PM5,
            method: DateMethod::YearCircaPm5,
            evidence_paths,
            warnings: Vec::new(),
        };
    }

    // Rule 4: explicit range, e.g. "1500-1599" / "1500/1599". Requires
    // start <= end; otherwise fall through to rule 5 per spec.md §4.1.
    if let Some(caps) = RULE4_RANGE.captures(trimmed) {
        let start: i32 = caps[1].parse().unwrap();
        let end: i32 = caps[2].parse().unwrap();
        if start <= end {
            return NormalizedDate {
                start: Some(start),
                end: Some(end),
                label: trimmed.to_string(),
                confidence: confidence::YEAR_RANGE,
                method: DateMethod::YearRange,
                evidence_paths,
                warnings: Vec::new(),
            };
        }
        // fall through
    }

    // Rule 5: first embedded 4-digit year anywhere in the string.
    if let Some(caps) = RULE5_EMBEDDED.captures(trimmed) {
        let year: i32 = caps[1].parse().unwrap();
        return NormalizedDate {
            start: Some(year),
            end: Some(year),
            label: trimmed.to_string(),
            confidence: confidence::YEAR_EMBEDDED,
            method: DateMethod::YearEmbedded,
            evidence_paths,
            warnings: vec![format!("embedded year {year} extracted from {trimmed:?}")],
        };
    }

    // Rule 6: unparsed — no exception, this is the failure surface.
    NormalizedDate {
        start: None,
        end: None,
        label: trimmed.to_string(),
        confidence: confidence::UNPARSED_OR_MISSING,
        method: DateMethod::Unparsed,
        evidence_paths,
        warnings: vec![format!("could not parse date {trimmed:?}")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule1_exact_year() {
        let d = normalize_date(Some("1650"), vec!["260[0]$c".into()]);
        assert_eq!((d.start, d.end), (Some(1650), Some(1650)));
        assert_eq!(d.method, DateMethod::YearExact);
        assert_eq!(d.confidence, confidence::YEAR_EXACT);
    }

    #[test]
    fn rule2_bracketed_year() {
        // spec.md §8 scenario 1: "[1680]" -> start=1680, end=1680, 0.95.
        let d = normalize_date(Some("[1680]"), vec![]);
        assert_eq!((d.start, d.end), (Some(1680), Some(1680)));
        assert_eq!(d.method, DateMethod::YearBracketed);
        assert_eq!(d.confidence, confidence::YEAR_BRACKETED);
    }

    #[test]
    fn rule3_circa() {
        let d = normalize_date(Some("c.1700"), vec![]);
        assert_eq!((d.start, d.end), (Some(1695), Some(1705)));
        assert_eq!(d.method, DateMethod::YearCircaPm5);
    }

    #[test]
    fn rule3_circa_no_dot() {
        let d = normalize_date(Some("c 1700"), vec![]);
        assert_eq!((d.start, d.end), (Some(1695), Some(1705)));
    }

    #[test]
    fn rule4_range() {
        let d = normalize_date(Some("1500-1599"), vec![]);
        assert_eq!((d.start, d.end), (Some(1500), Some(1599)));
        assert_eq!(d.method, DateMethod::YearRange);
    }

    #[test]
    fn rule4_range_with_slash() {
        let d = normalize_date(Some("1500/1599"), vec![]);
        assert_eq!((d.start, d.end), (Some(1500), Some(1599)));
    }

    #[test]
    fn rule4_inverted_range_falls_to_rule5() {
        // Boundary behavior in spec.md §8: start > end falls through to rule 5.
        let d = normalize_date(Some("1599-1500"), vec![]);
        assert_eq!(d.method, DateMethod::YearEmbedded);
        assert_eq!((d.start, d.end), (Some(1599), Some(1599)));
    }

    #[test]
    fn rule5_embedded_year() {
        let d = normalize_date(Some("Printed in the yeare 1648, by J. Smith"), vec![]);
        assert_eq!((d.start, d.end), (Some(1648), Some(1648)));
        assert_eq!(d.method, DateMethod::YearEmbedded);
        assert!(!d.warnings.is_empty());
    }

    #[test]
    fn rule6_unparsed() {
        let d = normalize_date(Some("s.n."), vec![]);
        assert_eq!((d.start, d.end), (None, None));
        assert_eq!(d.method, DateMethod::Unparsed);
        assert_eq!(d.confidence, 0.0);
        assert!(!d.warnings.is_empty());
    }

    #[test]
    fn missing_input() {
        let d = normalize_date(None, vec![]);
        assert_eq!(d.method, DateMethod::Missing);
        assert_eq!(d.confidence, 0.0);
        assert!(d.warnings.is_empty());
    }

    #[test]
    fn date_range_start_equals_end_is_valid() {
        let d = normalize_date(Some("1650"), vec![]);
        assert!(d.is_valid());
    }

    #[test]
    fn idempotent_on_cleaned_form() {
        // normalize(normalize(x).label) == normalize(x) for a bracketed year.
        let first = normalize_date(Some("[1680]"), vec![]);
        let second = normalize_date(Some(&first.label), vec![]);
        assert_eq!(first.start, second.start);
        assert_eq!(first.end, second.end);
        assert_eq!(first.method, second.method);
    }
}
