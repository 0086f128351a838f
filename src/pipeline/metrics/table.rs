//! Tabular pass: markdown, LaTeX, tab-separated and space-aligned rows.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{MatchSource, ReferenceRange};

use super::extractor::{ExtractedMatches, RawMatch};
use super::free_text::rule_for_label;
use super::names::{canonical_name, collapse_whitespace, is_known};
use super::registry::RuleRegistry;
use super::value::{parse_value, split_value_and_unit};

const MAX_LABEL_LEN: usize = 60;
const MAX_UNIT_LEN: usize = 24;

/// Flag words printed next to values; never units.
const STATUS_WORDS: &[&str] = &["low", "high", "normal", "abnormal", "borderline", "critical", "h", "l", "n"];

static LATEX_RULES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:hline|toprule|midrule|bottomrule|cline\{[^}]*\})").unwrap()
});

static LATEX_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:textbf|textit|text|mathrm|emph)\{([^}]*)\}").unwrap()
});

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").unwrap());

static QUALIFIERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:total|count|calculated)\b").unwrap());

static SERIAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+[.)]\s+").unwrap());

static SEPARATOR_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?::?-{2,}:?|=+|\+?(?:-+\+)+-*)$").unwrap());

static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {3,}").unwrap());

/// How a row separates its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    Markdown,
    Latex,
    Tab,
    Aligned,
}

/// Heuristic: a line is a table row if it has multiple columns separated by
/// pipes, LaTeX `&`, tabs, or consistent multi-space gaps.
pub fn row_format(line: &str) -> Option<RowFormat> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Pipe-separated: 2+ pipes
    if trimmed.matches('|').count() >= 2 {
        return Some(RowFormat::Markdown);
    }

    // LaTeX: "a & b \\" or at least two ampersands
    if trimmed.contains('&') && (trimmed.ends_with(r"\\") || trimmed.matches('&').count() >= 2) {
        return Some(RowFormat::Latex);
    }

    if trimmed.contains('\t') {
        return Some(RowFormat::Tab);
    }

    // Multi-space aligned: 2+ runs of 3+ spaces between non-empty segments
    if count_multi_space_gaps(trimmed) >= 2 {
        return Some(RowFormat::Aligned);
    }

    None
}

/// Count runs of 3+ consecutive spaces that separate non-empty text segments.
fn count_multi_space_gaps(text: &str) -> usize {
    let mut count = 0;
    let mut in_gap = false;
    let mut gap_len = 0;

    for ch in text.chars() {
        if ch == ' ' {
            gap_len += 1;
            if gap_len >= 3 && !in_gap {
                in_gap = true;
                count += 1;
            }
        } else {
            in_gap = false;
            gap_len = 0;
        }
    }

    count
}

/// Split a table row into non-empty cells. `None` for non-rows, separator
/// rows, and rows with fewer than two cells.
pub fn split_row(line: &str) -> Option<Vec<String>> {
    let line = LATEX_RULES.replace_all(line, "");
    let trimmed = line.trim();

    let parts: Vec<&str> = match row_format(trimmed)? {
        RowFormat::Markdown => trimmed.split('|').collect(),
        RowFormat::Latex => trimmed.trim_end_matches(r"\\").split('&').collect(),
        RowFormat::Tab => trimmed.split('\t').collect(),
        RowFormat::Aligned => MULTI_SPACE.split(trimmed).collect(),
    };

    let cells: Vec<String> = parts
        .into_iter()
        .map(clean_cell)
        .filter(|c| !c.is_empty())
        .collect();

    if cells.len() < 2 || cells.iter().all(|c| SEPARATOR_CELL.is_match(c)) {
        return None;
    }
    Some(cells)
}

/// Strip decorative markup from a cell.
fn clean_cell(cell: &str) -> String {
    let unwrapped = LATEX_MARKUP.replace_all(cell, "$1");
    let stripped = unwrapped
        .replace("**", "")
        .replace("__", "")
        .replace(['`', '$'], "")
        .replace(r"\%", "%");
    collapse_whitespace(&stripped)
}

/// Clean a label cell: parentheticals, serial numbers, qualifier words.
/// `None` when nothing label-like is left.
pub fn clean_label(cell: &str) -> Option<String> {
    let cleaned = clean_cell(cell);
    let cleaned = PARENTHETICAL.replace_all(&cleaned, " ");
    let cleaned = SERIAL.replace(cleaned.trim(), "");
    let cleaned = QUALIFIERS.replace_all(&cleaned, " ");
    let label = collapse_whitespace(&cleaned)
        .trim_matches(|c: char| c == ':' || c == '-' || c == '.' || c.is_whitespace())
        .to_string();

    if label.is_empty()
        || label.len() > MAX_LABEL_LEN
        || !label.chars().any(char::is_alphabetic)
        || parse_value(&label).is_some()
    {
        return None;
    }
    Some(label)
}

fn is_status_word(text: &str) -> bool {
    STATUS_WORDS.iter().any(|w| w.eq_ignore_ascii_case(text.trim()))
}

fn is_range(cell: &str) -> bool {
    cell.parse::<ReferenceRange>().is_ok()
}

fn is_unit_cell(cell: &str) -> bool {
    let Some(first) = cell.chars().next() else {
        return false;
    };
    cell.len() <= MAX_UNIT_LEN
        && (first.is_alphabetic() || first == '%' || first == 'µ' || first == '/')
        && !cell.contains(' ')
        && !is_status_word(cell)
        && parse_value(cell).is_none()
        && !is_range(cell)
}

/// Unit words accepted as evidence that an unmapped row is a lab result.
const UNIT_WORDS: &[&str] = &[
    "fl", "pg", "mmhg", "g", "mg", "ng", "mcg", "µg", "iu", "u", "mmol", "meq", "cells", "cumm",
    "lakh", "lakhs", "million", "mill", "ratio", "sec", "secs",
];

/// A unit that could only come from a lab result column.
fn is_lab_unit(unit: &str) -> bool {
    let unit = unit.trim();
    unit.contains('/')
        || unit.contains('%')
        || unit.starts_with('µ')
        || UNIT_WORDS.iter().any(|w| w.eq_ignore_ascii_case(unit))
}

/// Canonical name for a label cell: the synonym table, then the rule
/// registry. `None` for labels neither knows.
fn known_metric(label: &str) -> Option<String> {
    if is_known(label) {
        return Some(canonical_name(label));
    }
    rule_for_label(label, RuleRegistry::builtin()).map(str::to_string)
}

/// Turn one row into a canonical metric and its raw match.
///
/// The label is the first label-like cell. The value must follow it, with
/// only status flags or a range cell in between. The unit comes from the
/// value cell or the next unit-like cell. Labels unknown to the synonym
/// table and the registry also need a lab unit or a range in the row.
pub fn parse_row(cells: &[String]) -> Option<(String, RawMatch)> {
    let (label_idx, label) = cells
        .iter()
        .enumerate()
        .find_map(|(i, c)| clean_label(c).map(|l| (i, l)))?;

    let mut value = None;
    for (offset, cell) in cells[label_idx + 1..].iter().enumerate() {
        if is_range(cell) || is_status_word(cell) {
            continue;
        }
        match split_value_and_unit(cell) {
            Some((_, inline_unit)) => value = Some((label_idx + 1 + offset, inline_unit)),
            None => tracing::debug!(label = %label, "Table row value cell is not a number"),
        }
        break;
    }
    let (value_idx, inline_unit) = value?;

    let unit = inline_unit.filter(|u| !is_status_word(u)).or_else(|| {
        cells[value_idx + 1..]
            .iter()
            .find(|c| is_unit_cell(c))
            .cloned()
    });

    let metric = match known_metric(&label) {
        Some(metric) => metric,
        None => {
            let corroborated =
                unit.as_deref().is_some_and(is_lab_unit) || cells.iter().any(|c| is_range(c));
            if !corroborated {
                tracing::debug!(label = %label, "Unmapped table row without unit or range");
                return None;
            }
            canonical_name(&label)
        }
    };

    let found = RawMatch {
        label,
        raw: cells[value_idx].clone(),
        unit,
        source: MatchSource::Table,
    };
    Some((metric, found))
}

/// Run the tabular pass. A later row for the same metric replaces the earlier one.
pub fn extract_table_rows(text: &str) -> ExtractedMatches {
    let mut matches = ExtractedMatches::new();
    for line in text.lines() {
        let Some(cells) = split_row(line) else {
            continue;
        };
        if let Some((metric, found)) = parse_row(&cells) {
            matches.insert(metric, found);
        }
    }
    matches
}
