//! Step-by-step explanations in deep mode.

use tracing::{info, instrument};

use super::prompts::{self, DEEP_EXPLAIN_PROMPT, SYSTEM_PROMPT};
use super::validator::ValidationReport;
use crate::actors::traits::LlmActor;
use crate::error::AppError;
use crate::models::{ChatMessage, CompletionRequest};

/// Builds the deep-mode request. Also used by the streaming path.
pub fn explain_request(model: &str, query: &str, context: &str, history: &[ChatMessage]) -> CompletionRequest {
    let history = prompts::history_section(history);
    let prompt = prompts::render(
        DEEP_EXPLAIN_PROMPT,
        &[("history", &history), ("context", context), ("question", query)],
    );
    CompletionRequest::new(model, prompt).with_system(SYSTEM_PROMPT)
}

#[instrument(skip(llm, context, history), fields(context_len = context.len()))]
pub async fn explain<L>(
    llm: &L,
    model: &str,
    query: &str,
    context: &str,
    history: &[ChatMessage],
) -> Result<String, AppError>
where
    L: LlmActor + ?Sized,
{
    llm.complete(explain_request(model, query, context, history)).await
}

/// Returns the corrected answer when the validator rejected the explanation
/// and supplied a replacement, otherwise the explanation itself.
pub fn apply_validation(explanation: String, report: &ValidationReport) -> String {
    if !report.is_valid && !report.corrected_answer.trim().is_empty() {
        info!(
            confidence = report.confidence,
            issues = report.issues.len(),
            "Validator replaced the explanation"
        );
        return report.corrected_answer.clone();
    }
    explanation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::ScriptedLlm;

    fn report(is_valid: bool, corrected: &str) -> ValidationReport {
        ValidationReport {
            is_valid,
            confidence: 80,
            issues: vec![],
            suggestions: String::new(),
            corrected_answer: corrected.to_string(),
        }
    }

    #[tokio::test]
    async fn test_explain_uses_deep_template() {
        let llm = ScriptedLlm::replying(&["Bước 1: ..."]);
        let reply = explain(&llm, "gpt-4", "Giải thích chi tiết số chẵn", "Số chẵn chia hết cho 2", &[])
            .await
            .unwrap();
        assert_eq!(reply, "Bước 1: ...");

        let request = &llm.requests()[0];
        assert_eq!(request.model, "gpt-4");
        assert!(request.prompt.starts_with("Bài học (có ghi nguồn): Số chẵn chia hết cho 2"));
        assert!(request.prompt.contains("Em hỏi: Giải thích chi tiết số chẵn"));
    }

    #[test]
    fn test_invalid_report_with_correction_overrides() {
        let out = apply_validation("sai".to_string(), &report(false, "đúng"));
        assert_eq!(out, "đúng");
    }

    #[test]
    fn test_valid_or_empty_correction_keeps_explanation() {
        assert_eq!(apply_validation("gốc".to_string(), &report(true, "khác")), "gốc");
        assert_eq!(apply_validation("gốc".to_string(), &report(false, "  ")), "gốc");
    }
}
