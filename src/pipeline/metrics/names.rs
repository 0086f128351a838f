//! Surface label to canonical metric name.
//!
//! Open vocabulary: labels missing from the table pass through unchanged and
//! become their own canonical identifier.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Canonical metric identifiers known to the registry and reference table.
pub const CANONICAL_METRICS: &[&str] = &[
    "Hemoglobin", "RBC", "WBC", "Platelets", "Hematocrit", "MCV", "MCH", "MCHC",
    "RDW", "Neutrophils", "Lymphocytes", "Eosinophils", "Monocytes", "Basophils",
    "ESR", "Glucose", "HbA1c", "Creatinine", "Urea", "BUN", "Uric Acid",
    "Cholesterol", "HDL", "LDL", "Triglycerides", "Sodium", "Potassium",
    "Chloride", "Calcium", "Bilirubin", "ALT", "AST", "ALP", "Albumin", "TSH",
    "Vitamin D", "Vitamin B12", "Ferritin", "Iron", "BMI", "Blood Pressure",
];

/// Surface forms (lowercase) mapped to canonical names.
const SYNONYMS: &[(&str, &str)] = &[
    ("hb", "Hemoglobin"),
    ("hgb", "Hemoglobin"),
    ("haemoglobin", "Hemoglobin"),
    ("rbc", "RBC"),
    ("red blood cells", "RBC"),
    ("red blood cell", "RBC"),
    ("rbc count", "RBC"),
    ("erythrocytes", "RBC"),
    ("wbc", "WBC"),
    ("tlc", "WBC"),
    ("total leucocyte", "WBC"),
    ("total leukocyte", "WBC"),
    ("leucocyte", "WBC"),
    ("leukocytes", "WBC"),
    ("white blood cells", "WBC"),
    ("white blood cell", "WBC"),
    ("platelet", "Platelets"),
    ("plt", "Platelets"),
    ("platelet count", "Platelets"),
    ("thrombocytes", "Platelets"),
    ("pcv", "Hematocrit"),
    ("hct", "Hematocrit"),
    ("haematocrit", "Hematocrit"),
    ("packed cell volume", "Hematocrit"),
    ("mean corpuscular volume", "MCV"),
    ("mean corpuscular hemoglobin", "MCH"),
    ("mean corpuscular hemoglobin concentration", "MCHC"),
    ("rdw-cv", "RDW"),
    ("rdw cv", "RDW"),
    ("red cell distribution width", "RDW"),
    ("neutrophil", "Neutrophils"),
    ("polymorphs", "Neutrophils"),
    ("lymphocyte", "Lymphocytes"),
    ("eosinophil", "Eosinophils"),
    ("monocyte", "Monocytes"),
    ("basophil", "Basophils"),
    ("erythrocyte sedimentation rate", "ESR"),
    ("blood sugar", "Glucose"),
    ("blood glucose", "Glucose"),
    ("fasting blood sugar", "Glucose"),
    ("fasting glucose", "Glucose"),
    ("fbs", "Glucose"),
    ("plasma glucose", "Glucose"),
    ("fasting plasma glucose", "Glucose"),
    ("random blood sugar", "Glucose"),
    ("glycated hemoglobin", "HbA1c"),
    ("glycosylated hemoglobin", "HbA1c"),
    ("a1c", "HbA1c"),
    ("hemoglobin a1c", "HbA1c"),
    ("haemoglobin a1c", "HbA1c"),
    ("hb a1c", "HbA1c"),
    ("serum creatinine", "Creatinine"),
    ("blood urea", "Urea"),
    ("serum urea", "Urea"),
    ("blood urea nitrogen", "BUN"),
    ("serum uric acid", "Uric Acid"),
    ("serum cholesterol", "Cholesterol"),
    ("hdl cholesterol", "HDL"),
    ("hdl-c", "HDL"),
    ("ldl cholesterol", "LDL"),
    ("ldl-c", "LDL"),
    ("triglyceride", "Triglycerides"),
    ("tg", "Triglycerides"),
    ("serum sodium", "Sodium"),
    ("serum potassium", "Potassium"),
    ("serum chloride", "Chloride"),
    ("serum calcium", "Calcium"),
    ("serum albumin", "Albumin"),
    ("na", "Sodium"),
    ("na+", "Sodium"),
    ("k", "Potassium"),
    ("k+", "Potassium"),
    ("cl", "Chloride"),
    ("serum bilirubin", "Bilirubin"),
    ("sgpt", "ALT"),
    ("sgot", "AST"),
    ("alkaline phosphatase", "ALP"),
    ("thyroid stimulating hormone", "TSH"),
    ("25-oh vitamin d", "Vitamin D"),
    ("vit d", "Vitamin D"),
    ("vit b12", "Vitamin B12"),
    ("serum ferritin", "Ferritin"),
    ("serum iron", "Iron"),
    ("body mass index", "BMI"),
    ("bp", "Blood Pressure"),
    ("blood pressure", "Blood Pressure"),
];

static LOOKUP: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    let mut map: HashMap<String, &'static str> = CANONICAL_METRICS
        .iter()
        .map(|name| (name.to_lowercase(), *name))
        .collect();
    for (surface, canonical) in SYNONYMS {
        map.insert((*surface).to_string(), *canonical);
    }
    map
});

/// Collapse runs of whitespace to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Map a cleaned surface label to its canonical metric name.
pub fn canonical_name(label: &str) -> String {
    let collapsed = collapse_whitespace(label);
    match LOOKUP.get(&collapsed.to_lowercase()) {
        Some(canonical) => (*canonical).to_string(),
        None => collapsed,
    }
}

/// Whether the label maps to a metric known to the synonym table.
pub fn is_known(label: &str) -> bool {
    LOOKUP.contains_key(&collapse_whitespace(label).to_lowercase())
}

/// Every label that maps to `canonical`, the canonical name included.
pub fn surface_forms(canonical: &str) -> Vec<String> {
    let target = canonical_name(canonical);
    let mut forms = vec![target.clone()];
    for (surface, name) in SYNONYMS {
        if *name == target && !forms.iter().any(|f| f.eq_ignore_ascii_case(surface)) {
            forms.push((*surface).to_string());
        }
    }
    forms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations_map_to_canonical() {
        assert_eq!(canonical_name("Hb"), "Hemoglobin");
        assert_eq!(canonical_name("PCV"), "Hematocrit");
        assert_eq!(canonical_name("TLC"), "WBC");
        assert_eq!(canonical_name("BP"), "Blood Pressure");
    }

    #[test]
    fn lookup_ignores_case_and_spacing() {
        assert_eq!(canonical_name("  hemoglobin  "), "Hemoglobin");
        assert_eq!(canonical_name("Total   Leucocyte"), "WBC");
        assert_eq!(canonical_name("PLATELET COUNT"), "Platelets");
    }

    #[test]
    fn canonical_names_are_fixed_points() {
        for name in CANONICAL_METRICS {
            assert_eq!(canonical_name(name), *name);
        }
    }

    #[test]
    fn unmapped_label_passes_through() {
        assert_eq!(canonical_name("Procalcitonin"), "Procalcitonin");
        assert_eq!(canonical_name(" Serum  Lipase "), "Serum Lipase");
        assert!(!is_known("Procalcitonin"));
    }

    #[test]
    fn specimen_qualified_labels_map_to_canonical() {
        assert_eq!(canonical_name("Serum Sodium"), "Sodium");
        assert_eq!(canonical_name("Serum Potassium"), "Potassium");
        assert_eq!(canonical_name("Hemoglobin A1c"), "HbA1c");
        assert_eq!(canonical_name("HBA1C"), "HbA1c");
        assert_eq!(canonical_name("Fasting Plasma Glucose"), "Glucose");
    }

    #[test]
    fn surface_forms_include_synonyms() {
        let forms = surface_forms("Hemoglobin");
        assert_eq!(forms[0], "Hemoglobin");
        assert!(forms.iter().any(|f| f == "hb"));
        assert!(forms.iter().any(|f| f == "hgb"));

        assert_eq!(surface_forms("Procalcitonin"), vec!["Procalcitonin".to_string()]);
    }
}
