//! Conversation state per thread.
//!
//! Each thread keeps two lists: the transcript, every student and tutor
//! message in order (used for analysis and the session endpoint), and the
//! working history, the possibly summarised history fed back into prompts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{ChatMessage, Role};

#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Appends a message to the transcript, creating the thread if needed.
    async fn append(&self, thread_id: &str, message: ChatMessage) -> Result<(), AppError>;

    /// The full transcript, `None` for an unknown thread.
    async fn transcript(&self, thread_id: &str) -> Result<Option<Vec<ChatMessage>>, AppError>;

    /// The history to feed into the next prompt, empty for an unknown thread.
    async fn working_history(&self, thread_id: &str) -> Result<Vec<ChatMessage>, AppError>;

    async fn save_working_history(&self, thread_id: &str, history: Vec<ChatMessage>) -> Result<(), AppError>;

    /// Forgets a thread. Returns whether it existed.
    async fn clear(&self, thread_id: &str) -> Result<bool, AppError>;

    /// The transcript rendered as `Học sinh:` / `Trợ giảng:` lines.
    async fn conversation_history(&self, thread_id: &str) -> Result<String, AppError> {
        let transcript = self.transcript(thread_id).await?.unwrap_or_default();
        Ok(render_transcript(&transcript))
    }
}

/// Renders student and tutor messages one per line. Other roles are skipped.
fn render_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .filter_map(|m| match m.role {
            Role::User => Some(format!("Học sinh: {}", m.content)),
            Role::Assistant => Some(format!("Trợ giảng: {}", m.content)),
            Role::System => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Default)]
struct Thread {
    transcript: Vec<ChatMessage>,
    working: Vec<ChatMessage>,
}

/// Sessions kept in process memory; lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    threads: RwLock<HashMap<String, Thread>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn append(&self, thread_id: &str, message: ChatMessage) -> Result<(), AppError> {
        let mut threads = self.threads.write().await;
        threads.entry(thread_id.to_string()).or_default().transcript.push(message);
        Ok(())
    }

    async fn transcript(&self, thread_id: &str) -> Result<Option<Vec<ChatMessage>>, AppError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).map(|t| t.transcript.clone()))
    }

    async fn working_history(&self, thread_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).map(|t| t.working.clone()).unwrap_or_default())
    }

    async fn save_working_history(&self, thread_id: &str, history: Vec<ChatMessage>) -> Result<(), AppError> {
        let mut threads = self.threads.write().await;
        threads.entry(thread_id.to_string()).or_default().working = history;
        Ok(())
    }

    async fn clear(&self, thread_id: &str) -> Result<bool, AppError> {
        let mut threads = self.threads.write().await;
        Ok(threads.remove(thread_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transcript_and_rendering() {
        let store = MemorySessionStore::new();
        assert!(store.transcript("t1").await.unwrap().is_none());
        assert_eq!(store.conversation_history("t1").await.unwrap(), "");

        store.append("t1", ChatMessage::user("Số chẵn là gì?")).await.unwrap();
        store.append("t1", ChatMessage::assistant("Là số chia hết cho 2 em ạ.")).await.unwrap();
        store.append("t1", ChatMessage::system("ghi chú")).await.unwrap();

        assert_eq!(store.transcript("t1").await.unwrap().map(|t| t.len()), Some(3));
        assert_eq!(
            store.conversation_history("t1").await.unwrap(),
            "Học sinh: Số chẵn là gì?\nTrợ giảng: Là số chia hết cho 2 em ạ."
        );
    }

    #[tokio::test]
    async fn test_working_history_is_separate() {
        let store = MemorySessionStore::new();
        store.append("t1", ChatMessage::user("a")).await.unwrap();
        assert!(store.working_history("t1").await.unwrap().is_empty());

        store
            .save_working_history("t1", vec![ChatMessage::system("Tóm tắt"), ChatMessage::user("a")])
            .await
            .unwrap();
        assert_eq!(store.working_history("t1").await.unwrap().len(), 2);
        assert_eq!(store.transcript("t1").await.unwrap().map(|t| t.len()), Some(1));
    }

    #[tokio::test]
    async fn test_clear_and_isolation() {
        let store = MemorySessionStore::new();
        store.append("t1", ChatMessage::user("a")).await.unwrap();
        store.append("t2", ChatMessage::user("b")).await.unwrap();

        assert!(store.clear("t1").await.unwrap());
        assert!(!store.clear("t1").await.unwrap());
        assert!(store.transcript("t1").await.unwrap().is_none());
        assert_eq!(store.conversation_history("t2").await.unwrap(), "Học sinh: b");
    }
}
