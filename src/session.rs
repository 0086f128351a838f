//! Explicit per-user session state and multi-document batch processing.

use std::path::Path;
use std::sync::Arc;

use crate::analysis::{analyze_trends, TrendSummary};
use crate::config::AppConfig;
use crate::models::{AnalysisWarning, ReportEntry, ReportHistory};
use crate::pipeline::extraction::{extract_text, reader_for_path, ExtractionError};
use crate::pipeline::rag::{ConversationSession, RagError, ReportIndex};
use crate::pipeline::structuring::{LlmClient, ReportAnalysis, ReportAnalyzer};

pub const RETRIEVAL_INDEX: &str = "retrieval_index";
pub const BATCH_WORKER: &str = "batch_worker";

/// One uploaded document.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub source: String,
    pub bytes: Vec<u8>,
}

impl DocumentInput {
    pub fn new(source: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            bytes,
        }
    }

    /// Read a file, keyed by its file name.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let bytes = std::fs::read(path)?;
        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        Ok(Self { source, bytes })
    }
}

/// A readable document after analysis, with the text it was built from.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub analysis: ReportAnalysis,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Readable documents in input order.
    pub documents: Vec<ProcessedDocument>,
    /// Batch-level warnings (unreadable documents, worker failures).
    pub warnings: Vec<AnalysisWarning>,
}

fn process_document(analyzer: &ReportAnalyzer, input: &DocumentInput) -> Result<ProcessedDocument, ExtractionError> {
    let reader = reader_for_path(Path::new(&input.source))?;
    let text = extract_text(reader.as_ref(), &input.bytes, &input.source)?;
    let analysis = analyzer.analyze(&input.source, &text);
    Ok(ProcessedDocument { analysis, text })
}

/// Run each document's pipeline on its own blocking task and join in input order.
///
/// Unreadable or unsupported documents are excluded with a warning; the rest
/// of the batch continues.
pub async fn process_batch(analyzer: Arc<ReportAnalyzer>, inputs: Vec<DocumentInput>) -> BatchOutcome {
    let total = inputs.len();
    let handles: Vec<_> = inputs
        .into_iter()
        .map(|input| {
            let analyzer = Arc::clone(&analyzer);
            let source = input.source.clone();
            let handle = tokio::task::spawn_blocking(move || process_document(&analyzer, &input));
            (source, handle)
        })
        .collect();

    let mut outcome = BatchOutcome::default();
    for (source, handle) in handles {
        match handle.await {
            Ok(Ok(doc)) => outcome.documents.push(doc),
            Ok(Err(e)) => {
                tracing::warn!(source = %source, error = %e, "Document excluded from batch");
                outcome.warnings.push(AnalysisWarning::UnreadableDocument { source });
            }
            Err(e) => {
                tracing::error!(source = %source, error = %e, "Batch worker failed");
                outcome.warnings.push(AnalysisWarning::collaborator(BATCH_WORKER, e));
            }
        }
    }

    tracing::info!(
        documents = total,
        analyzed = outcome.documents.len(),
        warnings = outcome.warnings.len(),
        "Batch processed"
    );
    outcome
}

/// Everything one user session accumulates.
pub struct SessionContext {
    reports: ReportHistory,
    index: ReportIndex,
    conversation: ConversationSession,
    last_summary: Option<String>,
    config: AppConfig,
}

impl SessionContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            reports: ReportHistory::new(),
            index: ReportIndex::from_config(&config),
            conversation: ConversationSession::new(config.retrieval_top_k),
            last_summary: None,
            config,
        }
    }

    /// Record one analyzed document: history, retrieval index, last summary.
    ///
    /// Returns the analysis warnings plus any indexing failure.
    pub fn ingest(&mut self, document: ProcessedDocument) -> Vec<AnalysisWarning> {
        let ProcessedDocument { analysis, text } = document;
        let ReportAnalysis { entry, mut warnings } = analysis;

        if let Err(e) = self.index.index_report(&entry, &text) {
            tracing::warn!(source = %entry.source, error = %e, "Report not indexed for retrieval");
            warnings.push(AnalysisWarning::collaborator(RETRIEVAL_INDEX, e));
        }

        if entry.summary.is_some() {
            self.last_summary = entry.summary.clone();
        }
        if self.reports.add(entry) {
            tracing::info!("Replaced earlier analysis of the same report");
        }
        warnings
    }

    /// Ingest a whole batch in order; returns every warning.
    pub fn ingest_batch(&mut self, outcome: BatchOutcome) -> Vec<AnalysisWarning> {
        let BatchOutcome { documents, mut warnings } = outcome;
        for doc in documents {
            warnings.extend(self.ingest(doc));
        }
        warnings
    }

    pub fn ask(&mut self, question: &str, llm: &dyn LlmClient) -> Result<String, RagError> {
        self.conversation.ask(question, &self.index, llm)
    }

    pub fn reports(&self) -> &ReportHistory {
        &self.reports
    }

    pub fn latest_report(&self) -> Option<&ReportEntry> {
        self.reports.entries().last()
    }

    pub fn index(&self) -> &ReportIndex {
        &self.index
    }

    pub fn conversation(&self) -> &ConversationSession {
        &self.conversation
    }

    pub fn last_summary(&self) -> Option<&str> {
        self.last_summary.as_deref()
    }

    pub fn trends(&self) -> Vec<TrendSummary> {
        analyze_trends(&self.reports)
    }

    /// Discard all session state. Configuration is kept.
    pub fn reset(&mut self) {
        self.reports.clear();
        self.index.clear();
        self.conversation.clear();
        self.last_summary = None;
        tracing::info!("Session reset");
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
