use super::parser::parse_structured_summary;
use super::prompt::summary_messages;
use super::sanitize::sanitize_for_llm_with_audit;
use super::types::LlmClient;
use super::StructuringError;
use crate::models::{AnalysisWarning, MetricRecord, MetricValue, ReportEntry};
use crate::pipeline::metrics::MetricRecordBuilder;

/// Minimum input length worth summarizing (characters).
const MIN_INPUT_LENGTH: usize = 10;

/// Collaborator name used in warnings.
pub const SUMMARIZER: &str = "summarizer";

/// Asks the completion service for a medical summary of one report.
pub struct ReportSummarizer {
    llm: Box<dyn LlmClient>,
}

impl ReportSummarizer {
    pub fn new(llm: Box<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Sanitize, prompt, complete. Returns the raw summary text.
    pub fn summarize(&self, report_text: &str, source: &str) -> Result<String, StructuringError> {
        let clean = sanitize_for_llm_with_audit(report_text, Some(source));
        if clean.trim().len() < MIN_INPUT_LENGTH {
            return Err(StructuringError::InputTooShort);
        }

        tracing::info!(source = %source, input_len = clean.len(), "Requesting report summary");
        let summary = self.llm.complete(&summary_messages(&clean))?;
        tracing::debug!(source = %source, summary_len = summary.len(), "Summary received");
        Ok(summary)
    }
}

/// Result of analyzing one report.
#[derive(Debug, Clone)]
pub struct ReportAnalysis {
    pub entry: ReportEntry,
    pub warnings: Vec<AnalysisWarning>,
}

/// Builds the record set for one report: the structured summary when the
/// summarizer is available and its metric array parses, pattern extraction
/// otherwise.
pub struct ReportAnalyzer {
    summarizer: Option<ReportSummarizer>,
    builder: MetricRecordBuilder,
}

impl ReportAnalyzer {
    pub fn new(summarizer: Option<ReportSummarizer>, builder: MetricRecordBuilder) -> Self {
        Self { summarizer, builder }
    }

    /// Pattern extraction only.
    pub fn offline(builder: MetricRecordBuilder) -> Self {
        Self::new(None, builder)
    }

    pub fn builder(&self) -> &MetricRecordBuilder {
        &self.builder
    }

    pub fn analyze(&self, source: &str, text: &str) -> ReportAnalysis {
        let mut warnings = Vec::new();
        let mut summary_prose = None;
        let mut records: Option<Vec<MetricRecord>> = None;

        if let Some(summarizer) = &self.summarizer {
            match summarizer.summarize(text, source) {
                Ok(raw) => match parse_structured_summary(&raw) {
                    Ok(parsed) => {
                        let built = self.builder.build_from_summary(&parsed.metrics, text);
                        if built.iter().any(|r| r.value() != &MetricValue::Missing) {
                            records = Some(built);
                        } else {
                            tracing::info!(source = %source, "Summary carries no metric values, using pattern extraction");
                        }
                        summary_prose = Some(parsed.prose);
                    }
                    Err(e) => {
                        tracing::warn!(source = %source, error = %e, "Summary metrics unparseable, using pattern extraction");
                        warnings.push(AnalysisWarning::StructuredParseFailure {
                            source: source.to_string(),
                            message: e.to_string(),
                        });
                        summary_prose = Some(raw);
                    }
                },
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "Summarizer failed, using pattern extraction");
                    warnings.push(AnalysisWarning::collaborator(SUMMARIZER, &e));
                }
            }
        }

        let records = records.unwrap_or_else(|| self.builder.build(text));
        if records.is_empty() {
            tracing::info!(source = %source, "No recognizable health metrics found");
        }

        ReportAnalysis {
            entry: ReportEntry::new(source, text, records, summary_prose),
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricStatus, MetricValue};
    use crate::pipeline::structuring::MockLlmClient;

    const REPORT: &str = "Hemoglobin: 10.5 g/dL\nBP: 150/95 mmHg";

    fn analyzer_with(reply: MockLlmClient) -> ReportAnalyzer {
        ReportAnalyzer::new(
            Some(ReportSummarizer::new(Box::new(reply))),
            MetricRecordBuilder::default(),
        )
    }

    #[test]
    fn offline_uses_patterns() {
        let analysis = ReportAnalyzer::offline(MetricRecordBuilder::default()).analyze("a.txt", REPORT);
        assert!(analysis.warnings.is_empty());
        assert_eq!(analysis.entry.records.len(), 2);
        assert!(analysis.entry.summary.is_none());
    }

    #[test]
    fn summary_metrics_preferred() {
        let reply = "Low hemoglobin.\n```json\n[{\"metric\": \"Hemoglobin\", \"value\": \"9.8\", \"unit\": \"g/dL\", \"status\": \"Normal\"}]\n```";
        let analysis = analyzer_with(MockLlmClient::new(reply)).analyze("a.txt", REPORT);

        assert!(analysis.warnings.is_empty());
        assert_eq!(analysis.entry.records.len(), 1);
        let hb = &analysis.entry.records[0];
        assert_eq!(hb.value(), &MetricValue::Scalar(9.8));
        assert_eq!(hb.status(), MetricStatus::Low);
        assert_eq!(analysis.entry.summary.as_deref(), Some("Low hemoglobin."));
    }

    #[test]
    fn unparseable_summary_falls_back_with_warning() {
        let analysis = analyzer_with(MockLlmClient::new("All values look fine.")).analyze("a.txt", REPORT);

        assert!(matches!(
            analysis.warnings.as_slice(),
            [AnalysisWarning::StructuredParseFailure { .. }]
        ));
        assert_eq!(analysis.entry.records.len(), 2);
        assert_eq!(analysis.entry.summary.as_deref(), Some("All values look fine."));
    }

    #[test]
    fn summarizer_failure_is_collaborator_warning() {
        let analysis = analyzer_with(MockLlmClient::failing("down")).analyze("a.txt", REPORT);

        match analysis.warnings.as_slice() {
            [AnalysisWarning::CollaboratorFailure { collaborator, .. }] => {
                assert_eq!(collaborator, SUMMARIZER)
            }
            other => panic!("unexpected warnings: {other:?}"),
        }
        assert_eq!(analysis.entry.records.len(), 2);
    }

    #[test]
    fn empty_summary_array_falls_back_to_patterns() {
        let analysis = analyzer_with(MockLlmClient::new("Nothing.\n```json\n[]\n```")).analyze("a.txt", REPORT);
        assert!(analysis.warnings.is_empty());
        assert_eq!(analysis.entry.records.len(), 2);
    }

    #[test]
    fn summary_without_values_falls_back_to_patterns() {
        let reply = "Values unclear.\n```json\n[{\"metric\": \"Hemoglobin\", \"value\": null, \"unit\": \"g/dL\"}, {\"metric\": \"Glucose\", \"value\": \"N/A\"}]\n```";
        let analysis = analyzer_with(MockLlmClient::new(reply)).analyze("a.txt", REPORT);

        assert!(analysis.warnings.is_empty());
        assert_eq!(analysis.entry.records.len(), 2);
        assert_eq!(analysis.entry.records[0].value(), &MetricValue::Scalar(10.5));
        assert_eq!(analysis.entry.summary.as_deref(), Some("Values unclear."));
    }

    #[test]
    fn short_input_not_sent() {
        let mock = MockLlmClient::new("unused");
        let summarizer = ReportSummarizer::new(Box::new(mock));
        assert!(matches!(
            summarizer.summarize("Hb", "a.txt"),
            Err(StructuringError::InputTooShort)
        ));
    }
}
