//! Compacts long conversation histories into a summary plus recent turns.

use tracing::{debug, instrument, warn};

use super::prompts::{self, SUMMARIZE_PROMPT, SUMMARY_PREFIX};
use crate::actors::traits::LlmActor;
use crate::models::{ChatMessage, CompletionRequest};

/// Messages kept verbatim after compaction (two question/answer pairs).
pub const KEEP_RECENT: usize = 4;

/// Compaction starts once the history would exceed this many messages.
pub const COMPACT_TRIGGER: usize = 6;

/// Whether a history of `len` messages should be compacted.
pub fn needs_compaction(len: usize) -> bool {
    len > COMPACT_TRIGGER
}

/// Replaces everything but the last `keep_recent` messages with a summary.
///
/// Histories of `keep_recent` messages or fewer are returned unchanged. When
/// the summary cannot be produced only the recent messages are kept.
#[instrument(skip(llm, history), fields(history_len = history.len()))]
pub async fn compact<L>(llm: &L, model: &str, history: Vec<ChatMessage>, keep_recent: usize) -> Vec<ChatMessage>
where
    L: LlmActor + ?Sized,
{
    if history.len() <= keep_recent {
        return history;
    }

    let mut older = history;
    let recent = older.split_off(older.len() - keep_recent);

    let conversation = prompts::render_history(&older);
    let prompt = prompts::render(SUMMARIZE_PROMPT, &[("conversation", &conversation)]);

    match llm.complete(CompletionRequest::new(model, prompt)).await {
        Ok(summary) => {
            debug!(summarised = older.len(), "History compacted");
            let mut compacted = Vec::with_capacity(recent.len() + 1);
            compacted.push(ChatMessage::system(format!("{}{}", SUMMARY_PREFIX, summary.trim())));
            compacted.extend(recent);
            compacted
        }
        Err(e) => {
            warn!("Summarising history failed, keeping recent messages only: {}", e);
            recent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::tests::support::ScriptedLlm;

    fn turns(pairs: usize) -> Vec<ChatMessage> {
        (0..pairs)
            .flat_map(|i| {
                [
                    ChatMessage::user(format!("Câu hỏi {}", i)),
                    ChatMessage::assistant(format!("Trả lời {}", i)),
                ]
            })
            .collect()
    }

    #[test]
    fn test_trigger() {
        assert!(!needs_compaction(6));
        assert!(needs_compaction(7));
    }

    #[tokio::test]
    async fn test_short_history_untouched() {
        let llm = ScriptedLlm::new(vec![]);
        let history = turns(2);
        let out = compact(&llm, "m", history.clone(), KEEP_RECENT).await;
        assert_eq!(out, history);
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn test_older_turns_become_summary() {
        let llm = ScriptedLlm::replying(&["Em hỏi về số chẵn và số lẻ."]);
        let out = compact(&llm, "gpt-3.5-turbo", turns(4), KEEP_RECENT).await;

        assert_eq!(out.len(), 5);
        assert_eq!(out[0].role, Role::System);
        assert_eq!(out[0].content, "Tóm tắt cuộc hội thoại trước: Em hỏi về số chẵn và số lẻ.");
        assert_eq!(out[1].content, "Câu hỏi 2");
        assert_eq!(out[4].content, "Trả lời 3");

        let prompt = &llm.requests()[0].prompt;
        assert!(prompt.contains("Học sinh: Câu hỏi 0\nTrợ giảng: Trả lời 0"));
        assert!(!prompt.contains("Câu hỏi 2"));
    }

    #[tokio::test]
    async fn test_failure_keeps_recent_only() {
        let llm = ScriptedLlm::new(vec![]);
        let out = compact(&llm, "m", turns(4), KEEP_RECENT).await;
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].content, "Câu hỏi 2");
    }
}
