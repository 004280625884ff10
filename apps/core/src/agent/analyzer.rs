//! End-of-session progress report.

use tracing::instrument;

use super::prompts::{self, ANALYZER_PROMPT, ANALYZER_SYSTEM_PROMPT};
use crate::actors::traits::LlmActor;
use crate::brain::level::assess_level;
use crate::error::AppError;
use crate::models::{CompletionRequest, SessionAnalysis};

/// Writes a short assessment of the session and attaches the rule-based level.
#[instrument(skip(llm, conversation_history, transcript), fields(history_len = conversation_history.len()))]
pub async fn analyze<L>(
    llm: &L,
    model: &str,
    conversation_history: &str,
    transcript: &str,
) -> Result<SessionAnalysis, AppError>
where
    L: LlmActor + ?Sized,
{
    let prompt = prompts::render(
        ANALYZER_PROMPT,
        &[("transcript", transcript), ("conversation_history", conversation_history)],
    );
    let request = CompletionRequest::new(model, prompt).with_system(ANALYZER_SYSTEM_PROMPT);
    let analysis = llm.complete(request).await?;

    let level = assess_level(conversation_history);

    Ok(SessionAnalysis {
        analysis,
        level: level.level,
        level_reason: level.reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::level::StudentLevel;
    use crate::tests::support::ScriptedLlm;

    #[tokio::test]
    async fn test_analysis_with_level() {
        let llm = ScriptedLlm::replying(&["📊 Em đã hỏi về số chẵn."]);
        let history = "Học sinh: Số chẵn là gì?\nTrợ giảng: Là số chia hết cho 2.";

        let result = analyze(&llm, "gpt-3.5-turbo", history, "Bài 3: Số chẵn số lẻ").await.unwrap();
        assert_eq!(result.analysis, "📊 Em đã hỏi về số chẵn.");
        assert_eq!(result.level, StudentLevel::Beginner);
        assert!(result.level_reason.contains("1 câu"));

        let request = &llm.requests()[0];
        assert_eq!(request.system_prompt.as_deref(), Some(ANALYZER_SYSTEM_PROMPT));
        assert!(request.prompt.starts_with("Bài học: Bài 3: Số chẵn số lẻ"));
        assert!(request.prompt.contains("Hội thoại: Học sinh: Số chẵn là gì?"));
    }

    #[tokio::test]
    async fn test_llm_failure_is_an_error() {
        let llm = ScriptedLlm::new(vec![]);
        assert!(analyze(&llm, "m", "Học sinh: a", "t").await.is_err());
    }
}
