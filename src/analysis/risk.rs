//! Rule-based findings and classifier-backed risk predictions.

use serde::Serialize;

use crate::models::{AnalysisWarning, BloodPressureCategory, MetricRecord, MetricValue, RiskLevel};
use crate::pipeline::metrics::classify_blood_pressure;

use super::RiskError;

pub const RISK_CLASSIFIER: &str = "risk_classifier";

pub const ANEMIA_HEMOGLOBIN: f64 = 12.0;
pub const DIABETES_GLUCOSE: f64 = 125.0;
pub const PREDIABETES_GLUCOSE: f64 = 100.0;
pub const ELEVATED_CHOLESTEROL: f64 = 200.0;

/// One rule-based observation about a record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFinding {
    pub metric: String,
    pub level: RiskLevel,
    pub message: String,
}

impl RiskFinding {
    fn new(metric: &str, level: RiskLevel, message: impl Into<String>) -> Self {
        Self {
            metric: metric.to_string(),
            level,
            message: message.into(),
        }
    }
}

fn find<'a>(records: &'a [MetricRecord], metric: &str) -> Option<&'a MetricRecord> {
    records.iter().find(|r| r.metric().eq_ignore_ascii_case(metric))
}

fn scalar(records: &[MetricRecord], metric: &str) -> Option<f64> {
    find(records, metric).and_then(|r| r.value().as_scalar())
}

/// Fixed threshold rules over hemoglobin, glucose, cholesterol and blood pressure.
///
/// Metrics that are absent produce no finding. Composite values are never
/// compared against scalar thresholds.
pub fn assess_rules(records: &[MetricRecord]) -> Vec<RiskFinding> {
    let mut findings = Vec::new();

    if let Some(hb) = scalar(records, "Hemoglobin") {
        findings.push(if hb < ANEMIA_HEMOGLOBIN {
            RiskFinding::new("Hemoglobin", RiskLevel::Alert, "Possible anemia (low hemoglobin)")
        } else {
            RiskFinding::new("Hemoglobin", RiskLevel::Ok, "Hemoglobin looks normal")
        });
    }

    if let Some(glucose) = scalar(records, "Glucose") {
        findings.push(if glucose > DIABETES_GLUCOSE {
            RiskFinding::new("Glucose", RiskLevel::Alert, "Possible diabetes (high glucose)")
        } else if glucose > PREDIABETES_GLUCOSE {
            RiskFinding::new("Glucose", RiskLevel::Caution, "Pre-diabetic range")
        } else {
            RiskFinding::new("Glucose", RiskLevel::Ok, "Glucose level is normal")
        });
    }

    if let Some(chol) = scalar(records, "Cholesterol") {
        if chol > ELEVATED_CHOLESTEROL {
            findings.push(RiskFinding::new(
                "Cholesterol",
                RiskLevel::Caution,
                "Elevated cholesterol, watch diet",
            ));
        }
    }

    if let Some(bp) = find(records, "Blood Pressure") {
        findings.push(match bp.value() {
            MetricValue::Pair(sys, dia) => match classify_blood_pressure(*sys, *dia) {
                BloodPressureCategory::Hypertension => {
                    RiskFinding::new("Blood Pressure", RiskLevel::Alert, "Hypertension detected")
                }
                BloodPressureCategory::Prehypertension => {
                    RiskFinding::new("Blood Pressure", RiskLevel::Caution, "Prehypertension")
                }
                BloodPressureCategory::Normal => {
                    RiskFinding::new("Blood Pressure", RiskLevel::Ok, "Blood pressure is normal")
                }
            },
            MetricValue::Scalar(_) | MetricValue::Missing => RiskFinding::new(
                "Blood Pressure",
                RiskLevel::Caution,
                "Could not parse blood pressure reading",
            ),
        });
    }

    findings
}

/// Opaque probability model. Implementations are trained elsewhere.
pub trait RiskClassifier: Send + Sync {
    /// Probability of the positive class for one feature vector.
    fn predict(&self, features: &[f64]) -> Result<f64, RiskError>;
}

/// A disease and the ordered metrics its classifier expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseModel {
    pub disease: String,
    pub features: Vec<String>,
}

impl DiseaseModel {
    pub fn new(disease: &str, features: &[&str]) -> Self {
        Self {
            disease: disease.to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn anemia() -> Self {
        Self::new("anemia", &["Hemoglobin", "RBC", "MCV"])
    }

    pub fn diabetes() -> Self {
        Self::new("diabetes", &["Glucose", "HbA1c", "BMI"])
    }
}

/// Feature values in `features` order. Missing or composite values become 0.
pub fn feature_vector(records: &[MetricRecord], features: &[String]) -> Vec<f64> {
    features
        .iter()
        .map(|f| scalar(records, f).unwrap_or(0.0))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskPrediction {
    pub disease: String,
    pub probability: f64,
    pub advice: Vec<String>,
}

/// Runs registered classifiers over a record set.
#[derive(Default)]
pub struct RiskPredictor {
    models: Vec<(DiseaseModel, Box<dyn RiskClassifier>)>,
}

impl RiskPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: DiseaseModel, classifier: Box<dyn RiskClassifier>) {
        self.models.push((model, classifier));
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Predictions for every registered model.
    ///
    /// A failing classifier, or one returning a probability outside `[0, 1]`,
    /// becomes a warning and is skipped.
    pub fn predict_risks(&self, records: &[MetricRecord]) -> (Vec<RiskPrediction>, Vec<AnalysisWarning>) {
        let mut predictions = Vec::new();
        let mut warnings = Vec::new();

        for (model, classifier) in &self.models {
            let features = feature_vector(records, &model.features);
            let result = classifier.predict(&features).and_then(|p| {
                if (0.0..=1.0).contains(&p) {
                    Ok(p)
                } else {
                    Err(RiskError::InvalidProbability {
                        disease: model.disease.clone(),
                        value: p,
                    })
                }
            });

            match result {
                Ok(probability) => {
                    tracing::debug!(disease = %model.disease, probability, "Risk predicted");
                    predictions.push(RiskPrediction {
                        disease: model.disease.clone(),
                        probability,
                        advice: advice_for(&model.disease, probability, records),
                    });
                }
                Err(e) => {
                    tracing::warn!(disease = %model.disease, error = %e, "Risk classifier failed");
                    warnings.push(AnalysisWarning::collaborator(RISK_CLASSIFIER, e));
                }
            }
        }

        (predictions, warnings)
    }
}

fn advice_for(disease: &str, probability: f64, records: &[MetricRecord]) -> Vec<String> {
    if disease.eq_ignore_ascii_case("anemia") {
        anemia_advice(probability, scalar(records, "Hemoglobin"))
    } else {
        general_advice(disease, probability)
    }
}

/// Banded advice for anemia; hemoglobin notes only when a value was measured.
pub fn anemia_advice(probability: f64, hemoglobin: Option<f64>) -> Vec<String> {
    let mut advice = Vec::new();

    if probability > 0.7 {
        advice.push("High anemia risk: consult a hematologist promptly".to_string());
        if hemoglobin.is_some_and(|hb| hb < 8.0) {
            advice.push("Consider urgent blood transfusion evaluation".to_string());
        }
    } else if probability > 0.4 {
        advice.push("Moderate anemia risk. Recommended:".to_string());
        advice.push("- Iron studies (serum ferritin, TIBC)".to_string());
        advice.push("- Nutritional assessment".to_string());
    } else {
        advice.push("Low anemia risk: maintain an iron-rich diet".to_string());
    }

    if let Some(hb) = hemoglobin.filter(|hb| *hb < 11.0) {
        advice.push(format!(
            "Current hemoglobin ({} g/dL) below recommended threshold",
            crate::models::format_number(hb)
        ));
    }

    advice
}

fn general_advice(disease: &str, probability: f64) -> Vec<String> {
    let band = if probability > 0.7 {
        "High"
    } else if probability > 0.4 {
        "Moderate"
    } else {
        "Low"
    };
    vec![format!(
        "{band} {disease} risk ({:.0}%). Discuss with your healthcare provider",
        probability * 100.0
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceRange;

    struct Fixed(f64);

    impl RiskClassifier for Fixed {
        fn predict(&self, _features: &[f64]) -> Result<f64, RiskError> {
            Ok(self.0)
        }
    }

    struct Failing;

    impl RiskClassifier for Failing {
        fn predict(&self, _features: &[f64]) -> Result<f64, RiskError> {
            Err(RiskError::Model {
                disease: "anemia".into(),
                message: "weights missing".into(),
            })
        }
    }

    fn rec(metric: &str, value: MetricValue) -> MetricRecord {
        MetricRecord::new(metric, value, None, ReferenceRange::new(0.0, 1000.0))
    }

    fn level(findings: &[RiskFinding], metric: &str) -> Option<RiskLevel> {
        findings.iter().find(|f| f.metric == metric).map(|f| f.level)
    }

    #[test]
    fn low_hemoglobin_alert() {
        let findings = assess_rules(&[rec("Hemoglobin", MetricValue::Scalar(10.5))]);
        assert_eq!(level(&findings, "Hemoglobin"), Some(RiskLevel::Alert));
        let findings = assess_rules(&[rec("Hemoglobin", MetricValue::Scalar(12.0))]);
        assert_eq!(level(&findings, "Hemoglobin"), Some(RiskLevel::Ok));
    }

    #[test]
    fn glucose_bands() {
        let at = |v| level(&assess_rules(&[rec("Glucose", MetricValue::Scalar(v))]), "Glucose");
        assert_eq!(at(130.0), Some(RiskLevel::Alert));
        assert_eq!(at(125.0), Some(RiskLevel::Caution));
        assert_eq!(at(100.0), Some(RiskLevel::Ok));
    }

    #[test]
    fn cholesterol_only_flagged_when_elevated() {
        assert_eq!(
            level(&assess_rules(&[rec("Cholesterol", MetricValue::Scalar(210.0))]), "Cholesterol"),
            Some(RiskLevel::Caution)
        );
        assert!(assess_rules(&[rec("Cholesterol", MetricValue::Scalar(180.0))]).is_empty());
    }

    #[test]
    fn blood_pressure_uses_pair_rule() {
        let at = |v| level(&assess_rules(&[rec("Blood Pressure", v)]), "Blood Pressure");
        assert_eq!(at(MetricValue::Pair(150, 95)), Some(RiskLevel::Alert));
        assert_eq!(at(MetricValue::Pair(125, 70)), Some(RiskLevel::Caution));
        assert_eq!(at(MetricValue::Pair(110, 70)), Some(RiskLevel::Ok));
        assert_eq!(at(MetricValue::Missing), Some(RiskLevel::Caution));
    }

    #[test]
    fn empty_records_no_findings() {
        assert!(assess_rules(&[]).is_empty());
    }

    #[test]
    fn feature_vector_defaults_to_zero() {
        let records = vec![
            rec("hemoglobin", MetricValue::Scalar(10.5)),
            rec("MCV", MetricValue::Missing),
        ];
        assert_eq!(
            feature_vector(&records, &DiseaseModel::anemia().features),
            vec![10.5, 0.0, 0.0]
        );
    }

    #[test]
    fn feature_vector_excludes_pairs() {
        let records = vec![rec("Glucose", MetricValue::Pair(1, 2))];
        assert_eq!(feature_vector(&records, &DiseaseModel::diabetes().features), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn prediction_with_anemia_advice() {
        let mut predictor = RiskPredictor::new();
        predictor.register(DiseaseModel::anemia(), Box::new(Fixed(0.85)));
        let (predictions, warnings) =
            predictor.predict_risks(&[rec("Hemoglobin", MetricValue::Scalar(7.5))]);

        assert!(warnings.is_empty());
        assert_eq!(predictions[0].disease, "anemia");
        let advice = &predictions[0].advice;
        assert!(advice[0].starts_with("High anemia risk"));
        assert!(advice.iter().any(|a| a.contains("transfusion")));
        assert!(advice.iter().any(|a| a.contains("(7.5 g/dL)")));
    }

    #[test]
    fn moderate_and_low_bands() {
        assert_eq!(anemia_advice(0.5, Some(13.0)).len(), 3);
        assert_eq!(anemia_advice(0.1, None), vec!["Low anemia risk: maintain an iron-rich diet"]);
    }

    #[test]
    fn missing_hemoglobin_adds_no_threshold_note() {
        let advice = anemia_advice(0.9, None);
        assert_eq!(advice.len(), 1);
    }

    #[test]
    fn out_of_range_probability_is_warning() {
        let mut predictor = RiskPredictor::new();
        predictor.register(DiseaseModel::diabetes(), Box::new(Fixed(1.4)));
        predictor.register(DiseaseModel::anemia(), Box::new(Failing));
        let (predictions, warnings) = predictor.predict_risks(&[]);

        assert!(predictions.is_empty());
        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            &warnings[0],
            AnalysisWarning::CollaboratorFailure { collaborator, .. } if collaborator == RISK_CLASSIFIER
        ));
    }

    #[test]
    fn general_advice_for_other_diseases() {
        let mut predictor = RiskPredictor::new();
        predictor.register(DiseaseModel::diabetes(), Box::new(Fixed(0.5)));
        let (predictions, _) = predictor.predict_risks(&[]);
        assert_eq!(predictions[0].advice, vec!["Moderate diabetes risk (50%). Discuss with your healthcare provider"]);
    }
}
