use super::types::ChatMessage;

pub const SUMMARY_SYSTEM_PROMPT: &str = r#"
You are a medical expert assistant. You read medical reports and summarize them
accurately. Report only what the document states. Never invent values.
"#;

/// Build the summarization request for one report.
pub fn build_summary_prompt(report_text: &str) -> String {
    format!(
        r#"Carefully read and summarize the following medical report.
Your summary should include:
- Patient's name (if available)
- Date of the report (if available)
- Relevant medical history or background (in bullet points)
- Key findings and observations (in bullet points)
- Diagnoses or impressions (if mentioned)
- Recommendations for further tests, treatments, or follow-up (in bullet points)

Write the summary in clear, plain language that is understandable to both
medical professionals and patients.

After the summary, list every test result in a JSON array wrapped in ```json
fences. Each element is an object with the fields "metric", "value",
"reference_range", "unit" and "status" (Low, Normal or High). Use "N/A" for any
field the report does not give.

<document>
{report_text}
</document>"#
    )
}

/// System and user messages for a summary request.
pub fn summary_messages(report_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SUMMARY_SYSTEM_PROMPT.trim()),
        ChatMessage::user(build_summary_prompt(report_text)),
    ]
}
