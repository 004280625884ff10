//! Test doubles for the actor traits.

use crate::actors::messages::{ActorError, AppError, ChunkSender};
use crate::actors::traits::{LlmActor, RagActor};
use crate::models::{CompletionRequest, LessonChunk, Passage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// LLM that answers with a fixed script of replies, in order, and records
/// every request it receives. An exhausted script is an `LlmError`.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, AppError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<String, AppError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    /// Waits `delay` before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    async fn next_reply(&self, request: CompletionRequest) -> Result<String, AppError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ActorError::LlmError("no scripted reply left".to_string()).into()))
    }
}

#[async_trait]
impl LlmActor for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError> {
        self.next_reply(request).await
    }

    /// Streams the next reply word by word.
    async fn stream_complete(&self, request: CompletionRequest, chunk_sender: ChunkSender) -> Result<(), AppError> {
        let reply = self.next_reply(request).await?;
        for piece in reply.split_inclusive(' ') {
            if chunk_sender.send(Ok(piece.to_string())).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedSearch {
    pub query: String,
    pub limit: usize,
    pub lesson_id: Option<String>,
}

/// In-memory stand-in for the lesson index. Search returns stored passages
/// in insertion order, filtered by lesson, up to the limit.
#[derive(Default)]
pub struct MockRag {
    passages: Mutex<Vec<Passage>>,
    failure: Option<ActorError>,
    searches: Mutex<Vec<RecordedSearch>>,
    ingested: Mutex<Vec<LessonChunk>>,
    resets: AtomicUsize,
}

impl MockRag {
    pub fn with_passages(passages: Vec<(&str, &str)>) -> Self {
        let passages = passages
            .into_iter()
            .map(|(content, lesson_id)| Passage {
                content: content.to_string(),
                lesson_id: Some(lesson_id.to_string()),
                score: 0.0,
            })
            .collect();
        Self {
            passages: Mutex::new(passages),
            ..Default::default()
        }
    }

    pub fn failing(error: ActorError) -> Self {
        Self {
            failure: Some(error),
            ..Default::default()
        }
    }

    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.searches.lock().unwrap().clone()
    }

    pub fn ingested(&self) -> Vec<LessonChunk> {
        self.ingested.lock().unwrap().clone()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RagActor for MockRag {
    async fn ingest(&self, chunks: Vec<LessonChunk>) -> Result<usize, AppError> {
        if let Some(error) = &self.failure {
            return Err(error.clone().into());
        }
        let count = chunks.len();
        let mut passages = self.passages.lock().unwrap();
        passages.extend(chunks.iter().map(|c| Passage {
            content: c.content.clone(),
            lesson_id: Some(c.lesson_id.clone()),
            score: 0.0,
        }));
        self.ingested.lock().unwrap().extend(chunks);
        Ok(count)
    }

    async fn search(&self, query: String, limit: usize, lesson_id: Option<String>) -> Result<Vec<Passage>, AppError> {
        self.searches.lock().unwrap().push(RecordedSearch {
            query,
            limit,
            lesson_id: lesson_id.clone(),
        });
        if let Some(error) = &self.failure {
            return Err(error.clone().into());
        }
        Ok(self
            .passages
            .lock()
            .unwrap()
            .iter()
            .filter(|p| lesson_id.is_none() || p.lesson_id == lesson_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn reset(&self) -> Result<(), AppError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.passages.lock().unwrap().clear();
        self.ingested.lock().unwrap().clear();
        Ok(())
    }
}
