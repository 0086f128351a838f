//! Declarative free-text extraction rules.
//!
//! One entry per canonical metric. Adding a metric is adding a `MetricRule`;
//! the reference interval lives in `reference::BUILTIN_RANGES` under the same
//! canonical name.

use std::sync::LazyLock;

use regex::Regex;

/// Shape of the value a rule captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    /// `A/B` dual reading (blood pressure).
    Pair,
}

/// A free-text rule: label alternatives plus context words that disqualify an occurrence.
#[derive(Debug, Clone, Copy)]
pub struct MetricRule {
    pub canonical: &'static str,
    /// Regex fragments, case-insensitive, matched on word boundaries.
    pub labels: &'static [&'static str],
    pub kind: ValueKind,
    /// Native unit is percent; fractions are rescaled to 0-100.
    pub percentage: bool,
    /// Words that, right before the label on the same line, reject the occurrence.
    pub not_after: &'static [&'static str],
    /// Words that, between the label and the value, reject the occurrence.
    pub not_followed_by: &'static [&'static str],
}

impl MetricRule {
    pub const fn scalar(canonical: &'static str, labels: &'static [&'static str]) -> Self {
        Self {
            canonical,
            labels,
            kind: ValueKind::Scalar,
            percentage: false,
            not_after: &[],
            not_followed_by: &[],
        }
    }

    pub const fn pair(canonical: &'static str, labels: &'static [&'static str]) -> Self {
        Self {
            kind: ValueKind::Pair,
            ..Self::scalar(canonical, labels)
        }
    }

    pub const fn percent(self) -> Self {
        Self {
            percentage: true,
            ..self
        }
    }

    pub const fn not_after(self, words: &'static [&'static str]) -> Self {
        Self {
            not_after: words,
            ..self
        }
    }

    pub const fn not_followed_by(self, words: &'static [&'static str]) -> Self {
        Self {
            not_followed_by: words,
            ..self
        }
    }
}

const BUILTIN_RULES: &[MetricRule] = &[
    MetricRule::scalar("Hemoglobin", &["Ha?emoglobin", "Hb", "HGB"])
        .not_after(&["corpuscular", "glycated", "glycosylated"])
        .not_followed_by(&["a1c", "concentration"]),
    MetricRule::scalar("RBC", &["RBC", "Red Blood Cells?", "Erythrocytes"])
        .not_after(&["nucleated"]),
    MetricRule::scalar(
        "WBC",
        &["WBC", "TLC", "Total Leu[ck]ocyte Count", "White Blood Cells?", "Leu[ck]ocytes"],
    ),
    MetricRule::scalar("Platelets", &["Platelets?", "PLT"]),
    MetricRule::scalar("Hematocrit", &["Ha?ematocrit", "PCV", "HCT", "Packed Cell Volume"]).percent(),
    MetricRule::scalar("MCV", &["MCV", "Mean Corpuscular Volume"]),
    MetricRule::scalar("MCH", &["MCH", "Mean Corpuscular Ha?emoglobin"])
        .not_followed_by(&["concentration"]),
    MetricRule::scalar("MCHC", &["MCHC", "Mean Corpuscular Ha?emoglobin Concentration"]),
    MetricRule::scalar("RDW", &["RDW", "Red Cell Distribution Width"])
        .percent()
        .not_followed_by(&["sd"]),
    MetricRule::scalar("Neutrophils", &["Neutrophils?", "Polymorphs"])
        .percent()
        .not_after(&["absolute"]),
    MetricRule::scalar("Lymphocytes", &["Lymphocytes?"])
        .percent()
        .not_after(&["absolute"]),
    MetricRule::scalar("Eosinophils", &["Eosinophils?"])
        .percent()
        .not_after(&["absolute"]),
    MetricRule::scalar("Monocytes", &["Monocytes?"])
        .percent()
        .not_after(&["absolute"]),
    MetricRule::scalar("Basophils", &["Basophils?"])
        .percent()
        .not_after(&["absolute"]),
    MetricRule::scalar("ESR", &["ESR", "Erythrocyte Sedimentation Rate"]),
    MetricRule::scalar("Glucose", &["Glucose", "Blood Sugar", "FBS"]),
    MetricRule::scalar(
        "HbA1c",
        &["HbA1c", "Hb A1c", "A1c", "Glycated Ha?emoglobin", "Glycosylated Ha?emoglobin"],
    ),
    MetricRule::scalar("Creatinine", &["Creatinine"]).not_followed_by(&["clearance"]),
    MetricRule::scalar("Urea", &["Urea"]).not_followed_by(&["nitrogen"]),
    MetricRule::scalar("BUN", &["BUN", "Blood Urea Nitrogen"]),
    MetricRule::scalar("Uric Acid", &["Uric Acid"]),
    MetricRule::scalar("Cholesterol", &["Cholesterol"])
        .not_after(&["hdl", "ldl", "non-"])
        .not_followed_by(&["ratio", "/hdl"]),
    MetricRule::scalar("HDL", &["HDL"]).not_after(&["non-", "non "]),
    MetricRule::scalar("LDL", &["LDL"]),
    MetricRule::scalar("Triglycerides", &["Triglycerides?"]),
    MetricRule::scalar("Sodium", &["Sodium"]),
    MetricRule::scalar("Potassium", &["Potassium"]),
    MetricRule::scalar("Chloride", &["Chloride"]),
    MetricRule::scalar("Calcium", &["Calcium"]).not_after(&["ionized", "ionised"]),
    MetricRule::scalar("Bilirubin", &["Bilirubin"]).not_after(&["direct", "indirect"]),
    MetricRule::scalar("ALT", &["ALT", "SGPT"]),
    MetricRule::scalar("AST", &["AST", "SGOT"]),
    MetricRule::scalar("ALP", &["ALP", "Alkaline Phosphatase"]),
    MetricRule::scalar("Albumin", &["Albumin"])
        .not_after(&["micro"])
        .not_followed_by(&["globulin", "ratio"]),
    MetricRule::scalar("TSH", &["TSH", "Thyroid Stimulating Hormone"]),
    MetricRule::scalar("Vitamin D", &["Vitamin D3?", "25-?OH Vitamin D"]),
    MetricRule::scalar("Vitamin B12", &["Vitamin B12"]),
    MetricRule::scalar("Ferritin", &["Ferritin"]),
    MetricRule::scalar("Iron", &["Iron"]).not_followed_by(&["binding"]),
    MetricRule::scalar("BMI", &["BMI", "Body Mass Index"]),
    MetricRule::pair("Blood Pressure", &["Blood Pressure", "BP"]),
];

/// Canonical metrics whose native unit is percent.
pub const PERCENTAGE_METRICS: &[&str] = &[
    "Hematocrit", "Neutrophils", "Lymphocytes", "Eosinophils", "Monocytes", "Basophils", "RDW",
];

/// Optional unit after the value: percent, anything with a slash, or a bare unit word.
const UNIT_FRAGMENT: &str =
    r"(?:[ \t]*(?P<unit>%|[a-zµ][a-zµ0-9^.]*/[a-zµ0-9^.²³]+|/[a-zµ]+|(?:mmhg|fl|pg|lakhs?|million|mill|cumm|cells)\b))?";

/// A rule with its compiled patterns.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: MetricRule,
    /// Label, gap, value and optional unit in running text.
    pub pattern: Regex,
    /// Label alone, for table label cells.
    pub label_pattern: Regex,
}

/// Build the free-text pattern for a rule.
///
/// The gap between label and number skips up to 40 characters of non-digit
/// text on the same line (colons, dashes, parentheses, units).
fn compile(rule: &MetricRule) -> Result<Regex, regex::Error> {
    let labels = rule.labels.join("|");
    let value = match rule.kind {
        ValueKind::Scalar => r"(?P<value>\d+(?:,\d{2,3})*(?:\.\d+)?)",
        ValueKind::Pair => r"(?P<value>\d{2,3}\s*/\s*\d{2,3})",
    };
    Regex::new(&format!(
        r"(?i)\b(?P<label>{labels})\b(?P<gap>[^\d\n]{{0,40}}?){value}{UNIT_FRAGMENT}"
    ))
}

fn compile_label(rule: &MetricRule) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)\b(?:{})\b", rule.labels.join("|")))
}

/// The ordered set of free-text rules.
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<CompiledRule>,
}

static BUILTIN: LazyLock<RuleRegistry> =
    LazyLock::new(|| RuleRegistry::new(BUILTIN_RULES.iter().copied()));

impl RuleRegistry {
    /// Compile a registry. Rules whose pattern fails to compile are skipped.
    pub fn new(rules: impl IntoIterator<Item = MetricRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter_map(|rule| match compile(&rule).and_then(|p| compile_label(&rule).map(|l| (p, l))) {
                Ok((pattern, label_pattern)) => Some(CompiledRule {
                    rule,
                    pattern,
                    label_pattern,
                }),
                Err(e) => {
                    tracing::error!(metric = %rule.canonical, error = %e, "Invalid metric rule pattern");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    /// Shared built-in registry.
    pub fn builtin() -> &'static RuleRegistry {
        &BUILTIN
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn get(&self, canonical: &str) -> Option<&CompiledRule> {
        self.rules
            .iter()
            .find(|r| r.rule.canonical.eq_ignore_ascii_case(canonical))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

/// Whether the canonical metric is percentage-native.
pub fn is_percentage_metric(metric: &str) -> bool {
    PERCENTAGE_METRICS
        .iter()
        .any(|m| m.eq_ignore_ascii_case(metric))
}
