use crate::pipeline::structuring::sanitize_for_llm;

use super::types::ScoredChunk;

pub const CONVERSATION_SYSTEM_PROMPT: &str = r#"You are a medical report assistant. You help the user understand the lab reports they uploaded. You are not a doctor.

Rules:
1. Ground every statement in the provided report excerpts.
2. Do not diagnose or prescribe. Suggest discussing concerns with a healthcare provider.
3. Say clearly when the excerpts do not answer the question.
4. Name the report a value comes from when you cite it.
5. Use plain language and explain medical terms you use."#;

/// Render retrieved chunks as a delimited context block.
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    let mut context = String::from("<REPORT_EXCERPTS>\n");
    for chunk in chunks {
        context.push_str(&format!(
            "[Report: {}, part {}]\n{}\n\n",
            chunk.source,
            chunk.chunk_index + 1,
            sanitize_for_llm(&chunk.content)
        ));
    }
    context.push_str("</REPORT_EXCERPTS>");
    context
}

/// User turn: context block followed by the question.
pub fn build_question_prompt(question: &str, chunks: &[ScoredChunk]) -> String {
    format!(
        "{}\n\nQuestion: {}\n\nAnswer using only the report excerpts above.",
        build_context(chunks),
        sanitize_for_llm(question)
    )
}

/// Reply when no report has been indexed yet.
pub fn no_context_response() -> String {
    "I don't have any reports to reference yet. Analyze a report first and I'll answer questions about it.".to_string()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn scored(source: &str, index: usize, content: &str) -> ScoredChunk {
        ScoredChunk {
            report_id: Uuid::new_v4(),
            source: source.into(),
            chunk_index: index,
            content: content.into(),
            score: 0.9,
        }
    }

    #[test]
    fn context_names_sources() {
        let ctx = build_context(&[scored("cbc.pdf", 0, "Hemoglobin 10.5"), scored("lipid.pdf", 2, "LDL 130")]);
        assert!(ctx.starts_with("<REPORT_EXCERPTS>"));
        assert!(ctx.contains("[Report: cbc.pdf, part 1]\nHemoglobin 10.5"));
        assert!(ctx.contains("[Report: lipid.pdf, part 3]\nLDL 130"));
        assert!(ctx.ends_with("</REPORT_EXCERPTS>"));
    }

    #[test]
    fn question_follows_context() {
        let prompt = build_question_prompt("Is my LDL high?", &[scored("lipid.pdf", 0, "LDL 130")]);
        let ctx_end = prompt.find("</REPORT_EXCERPTS>").unwrap();
        let q = prompt.find("Question: Is my LDL high?").unwrap();
        assert!(q > ctx_end);
    }

    #[test]
    fn empty_context_still_delimited() {
        assert_eq!(build_context(&[]), "<REPORT_EXCERPTS>\n</REPORT_EXCERPTS>");
    }

    #[test]
    fn no_context_response_not_empty() {
        assert!(!no_context_response().is_empty());
    }
}
