use serde_json::{Map, Value};

use super::types::{StructuredSummary, SummaryMetric};
use super::StructuringError;

const NOT_AVAILABLE: &str = "N/A";
const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

const METRIC_KEYS: &[&str] = &["metric", "name", "test"];
const VALUE_KEYS: &[&str] = &["value", "result"];
const RANGE_KEYS: &[&str] = &["reference_range", "range", "normal_range"];
const UNIT_KEYS: &[&str] = &["unit", "units"];
const STATUS_KEYS: &[&str] = &["status", "flag"];

/// Split a summary into prose and its metric array.
///
/// The array is taken from a ```json fence when present, else the first
/// `[` that opens an array of objects. Single quotes, trailing commas and
/// `None`/`True`/`False` are repaired before parsing. Missing fields are
/// filled with `"N/A"` and metric names are title-cased.
pub fn parse_structured_summary(text: &str) -> Result<StructuredSummary, StructuringError> {
    let (json, span) = locate_metric_json(text)
        .ok_or_else(|| StructuringError::StructuredParse("No metric array found".into()))?;

    let repaired = repair_json(json);
    let parsed: Value = serde_json::from_str(&repaired)
        .map_err(|e| StructuringError::StructuredParse(e.to_string()))?;

    let items = match parsed {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .ok_or_else(|| StructuringError::StructuredParse("Object without metric array".into()))?,
        _ => return Err(StructuringError::StructuredParse("Expected a JSON array".into())),
    };

    // Lenient: skip non-object items
    let metrics = items
        .iter()
        .filter_map(Value::as_object)
        .map(summary_metric)
        .collect();

    let prose = format!("{}{}", &text[..span.0], &text[span.1..]).trim().to_string();
    Ok(StructuredSummary { prose, metrics })
}

fn summary_metric(obj: &Map<String, Value>) -> SummaryMetric {
    SummaryMetric {
        metric: title_case(&field(obj, METRIC_KEYS)),
        value: field(obj, VALUE_KEYS),
        reference_range: field(obj, RANGE_KEYS),
        unit: field(obj, UNIT_KEYS),
        status: field(obj, STATUS_KEYS),
    }
}

/// First present key (case-insensitive) rendered as text, else `"N/A"`.
fn field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    let found = keys.iter().find_map(|key| {
        obj.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    });
    let text = match found {
        None | Some(Value::Null) => return NOT_AVAILABLE.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    };
    if text.is_empty() || text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("none") {
        NOT_AVAILABLE.to_string()
    } else {
        text
    }
}

/// Title-case each word; all-caps words (acronyms like `WBC`) are kept.
fn title_case(name: &str) -> String {
    if name == NOT_AVAILABLE {
        return name.to_string();
    }
    name.split_whitespace()
        .map(|word| {
            let is_acronym = word.chars().any(char::is_alphabetic) && !word.chars().any(char::is_lowercase);
            if is_acronym {
                return word.to_string();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The JSON text and the byte span to remove from the prose.
fn locate_metric_json(text: &str) -> Option<(&str, (usize, usize))> {
    if let Some(open) = text.find(FENCE_OPEN) {
        let content_start = open + FENCE_OPEN.len();
        let (content_end, span_end) = match text[content_start..].find(FENCE_CLOSE) {
            Some(offset) => (content_start + offset, content_start + offset + FENCE_CLOSE.len()),
            None => (text.len(), text.len()),
        };
        return Some((text[content_start..content_end].trim(), (open, span_end)));
    }

    let start = text.char_indices().find_map(|(i, c)| {
        (c == '[' && text[i + 1..].trim_start().starts_with('{')).then_some(i)
    })?;
    let end = matching_bracket(text, start)?;
    Some((&text[start..=end], (start, end + 1)))
}

/// Byte index of the `]` closing the array opened at `start`, ignoring brackets in strings.
fn matching_bracket(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Rewrite Python-flavoured JSON into strict JSON.
fn repair_json(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            if c == '\\' && i + 1 < chars.len() {
                // \' is not a JSON escape
                if chars[i + 1] == '\'' {
                    out.push('\'');
                } else {
                    out.push(c);
                    out.push(chars[i + 1]);
                }
                i += 2;
                continue;
            }
            if c == q {
                out.push('"');
                quote = None;
            } else if c == '"' {
                out.push_str("\\\"");
            } else {
                out.push(c);
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push('"');
                i += 1;
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push_str(match word.as_str() {
                    "None" | "NaN" | "NULL" => "null",
                    "True" => "true",
                    "False" => "false",
                    other => other,
                });
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fenced_response() -> String {
        r#"**Patient:** Jane Doe
**Date:** 2024-03-02

- Hemoglobin is below the reference interval.
- Fasting glucose is normal.

```json
[
  {"metric": "hemoglobin", "value": "10.5", "reference_range": "13-17", "unit": "g/dL", "status": "Low"},
  {"metric": "Fasting Glucose", "value": 92, "reference_range": "70-100", "unit": "mg/dL", "status": "Normal"}
]
```

Follow up with a hematologist."#
            .to_string()
    }

    #[test]
    fn parses_fenced_block() {
        let summary = parse_structured_summary(&fenced_response()).unwrap();
        assert_eq!(summary.metrics.len(), 2);
        assert_eq!(summary.metrics[0].metric, "Hemoglobin");
        assert_eq!(summary.metrics[0].value, "10.5");
        assert_eq!(summary.metrics[1].value, "92");
        assert_eq!(summary.metrics[1].unit, "mg/dL");
    }

    #[test]
    fn prose_excludes_json_block() {
        let summary = parse_structured_summary(&fenced_response()).unwrap();
        assert!(summary.prose.starts_with("**Patient:** Jane Doe"));
        assert!(summary.prose.contains("Follow up with a hematologist."));
        assert!(!summary.prose.contains("```"));
        assert!(!summary.prose.contains("reference_range"));
    }

    #[test]
    fn repairs_python_literals() {
        let text = "Summary.\n[{'metric': 'hemoglobin', 'value': 10.5, 'reference_range': '13-17', 'unit': 'g/dL', 'status': 'Low',}, {'metric': 'glucose', 'value': None, 'status': 'Normal', 'fasting': True},]";
        let summary = parse_structured_summary(text).unwrap();
        assert_eq!(summary.metrics.len(), 2);
        assert_eq!(summary.metrics[0].metric, "Hemoglobin");
        assert_eq!(summary.metrics[1].value, "N/A");
        assert_eq!(summary.metrics[1].unit, "N/A");
        assert_eq!(summary.prose, "Summary.");
    }

    #[test]
    fn missing_fields_filled() {
        let summary = parse_structured_summary(r#"[{"metric": "Urea"}]"#).unwrap();
        let m = &summary.metrics[0];
        assert_eq!(
            (m.value.as_str(), m.reference_range.as_str(), m.unit.as_str(), m.status.as_str()),
            ("N/A", "N/A", "N/A", "N/A")
        );
    }

    #[test]
    fn apostrophe_inside_double_quotes_kept() {
        let summary = parse_structured_summary(r#"[{"metric": "Patient's Hb", "value": "10"}]"#).unwrap();
        assert_eq!(summary.metrics[0].metric, "Patient's Hb");
    }

    #[test]
    fn acronyms_survive_title_case() {
        assert_eq!(title_case("WBC"), "WBC");
        assert_eq!(title_case("total cholesterol"), "Total Cholesterol");
        assert_eq!(title_case("HbA1c"), "Hba1c");
    }

    #[test]
    fn object_wrapper_accepted() {
        let text = "```json\n{\"metrics\": [{\"metric\": \"Urea\", \"value\": 30}]}\n```";
        let summary = parse_structured_summary(text).unwrap();
        assert_eq!(summary.metrics[0].value, "30");
    }

    #[test]
    fn brackets_in_prose_ignored() {
        let text = "See note [1].\n[{\"metric\": \"Urea\", \"value\": \"30 [fasting]\"}]\nEnd [2].";
        let summary = parse_structured_summary(text).unwrap();
        assert_eq!(summary.metrics[0].value, "30 [fasting]");
        assert!(summary.prose.ends_with("End [2]."));
    }

    #[test]
    fn no_array_is_parse_error() {
        let err = parse_structured_summary("The report looks normal.").unwrap_err();
        assert!(matches!(err, StructuringError::StructuredParse(_)));
    }

    #[test]
    fn malformed_array_is_parse_error() {
        let err = parse_structured_summary("[{\"metric\": \"Urea\", \"value\": }]").unwrap_err();
        assert!(matches!(err, StructuringError::StructuredParse(_)));
    }

    #[test]
    fn empty_array_parses() {
        let summary = parse_structured_summary("```json\n[]\n```").unwrap();
        assert!(summary.metrics.is_empty());
    }
}
