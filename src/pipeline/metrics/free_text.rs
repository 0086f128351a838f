//! Free-text pass: one registry rule per metric, first valid occurrence wins.

use regex::Captures;

use crate::models::MatchSource;

use super::extractor::{ExtractedMatches, RawMatch};
use super::registry::{CompiledRule, MetricRule, RuleRegistry};
use super::value::parse_value;

/// How far back from a label the `not_after` words are looked for.
const PRECEDING_WINDOW: usize = 32;

/// Characters after the value included in the `not_followed_by` check.
const TRAILING_WINDOW: usize = 3;

/// Run every rule against `text`, inserting only metrics not already present.
pub fn extract_free_text(text: &str, registry: &RuleRegistry, matches: &mut ExtractedMatches) {
    for compiled in registry.rules() {
        let canonical = compiled.rule.canonical;
        if matches.contains(canonical) {
            continue;
        }
        if let Some(found) = first_match(compiled, text) {
            matches.insert_if_absent(canonical.to_string(), found);
        }
    }
}

/// First occurrence that passes the rule's exclusions and parses.
///
/// A rejected occurrence moves on to the next one; an occurrence that fails
/// value parsing drops the metric for this pass.
pub fn first_match(compiled: &CompiledRule, text: &str) -> Option<RawMatch> {
    for caps in compiled.pattern.captures_iter(text) {
        if is_excluded(compiled, text, &caps) {
            continue;
        }

        let label = caps.name("label")?.as_str();
        let raw = caps.name("value")?.as_str();
        if parse_value(raw).is_none() {
            tracing::debug!(metric = %compiled.rule.canonical, "Extraction miss: unparseable value");
            return None;
        }

        return Some(RawMatch {
            label: label.to_string(),
            raw: raw.to_string(),
            unit: caps.name("unit").map(|m| m.as_str().to_string()),
            source: MatchSource::FreeText,
        });
    }
    None
}

fn is_excluded(compiled: &CompiledRule, text: &str, caps: &Captures<'_>) -> bool {
    let (Some(label), Some(value)) = (caps.name("label"), caps.name("value")) else {
        return true;
    };
    let end = ceil_char_boundary(text, (value.end() + TRAILING_WINDOW).min(text.len()));
    is_excluded_span(&compiled.rule, text, label.start(), label.end(), end)
}

/// Exclusion words before `label_start`, or between `label_end` and `end`.
fn is_excluded_span(rule: &MetricRule, text: &str, label_start: usize, label_end: usize, end: usize) -> bool {
    if !rule.not_after.is_empty() {
        let preceding = preceding_words(text, label_start);
        if rule.not_after.iter().any(|w| preceding.contains(w)) {
            return true;
        }
    }

    if !rule.not_followed_by.is_empty() {
        let following = text[label_end..end].to_lowercase();
        if rule.not_followed_by.iter().any(|w| following.contains(w)) {
            return true;
        }
    }

    false
}

/// Canonical metric of the first rule whose label occurs in a table label
/// cell without tripping that rule's exclusions.
pub fn rule_for_label(label: &str, registry: &RuleRegistry) -> Option<&'static str> {
    registry.rules().iter().find_map(|compiled| {
        let hit = compiled
            .label_pattern
            .find_iter(label)
            .any(|m| !is_excluded_span(&compiled.rule, label, m.start(), m.end(), label.len()));
        hit.then_some(compiled.rule.canonical)
    })
}

/// The run of words directly before `at` on the same line, lowercased.
///
/// Stops at digits and list punctuation, so a value belonging to an earlier
/// metric on the same line is not taken as a qualifier.
fn preceding_words(text: &str, at: usize) -> String {
    let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
    let window_start = floor_char_boundary(text, at.saturating_sub(PRECEDING_WINDOW).max(line_start));
    let window = &text[window_start..at];

    let run_start = window
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_ascii_digit() || matches!(c, ':' | ',' | ';' | '|' | '(' | ')'))
        .map_or(0, |(i, c)| i + c.len_utf8());
    window[run_start..].to_lowercase()
}

fn floor_char_boundary(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}
