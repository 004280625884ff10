use crate::actors::messages::{AppError, ChunkSender};
use crate::models::{CompletionRequest, LessonChunk, Passage};
use async_trait::async_trait;

/// Defines the public interface for an LLM (Large Language Model) actor.
///
/// This trait abstracts the specific implementation of the LLM, allowing the hosted
/// chat API and test doubles to be used interchangeably.
#[async_trait]
pub trait LlmActor: Send + Sync + 'static {
    /// Generates a complete text response for a single request.
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError>;

    /// Generates a streaming response, sending chunks of text as they are produced.
    async fn stream_complete(
        &self,
        request: CompletionRequest,
        chunk_sender: ChunkSender,
    ) -> Result<(), AppError>;
}

/// Defines the public interface for a RAG (Retrieval-Augmented Generation) actor.
///
/// This trait abstracts the logic for managing and querying the lesson index.
#[async_trait]
pub trait RagActor: Send + Sync + 'static {
    /// Embeds and stores lesson chunks, returning how many were written.
    async fn ingest(&self, chunks: Vec<LessonChunk>) -> Result<usize, AppError>;

    /// Returns up to `limit` passages nearest to `query`, optionally within one lesson.
    async fn search(
        &self,
        query: String,
        limit: usize,
        lesson_id: Option<String>,
    ) -> Result<Vec<Passage>, AppError>;

    /// Removes every stored chunk.
    async fn reset(&self) -> Result<(), AppError>;
}
