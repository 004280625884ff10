use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::models::{
    ChatOutcome, CompletionRequest, LessonChunk, Passage, SessionAnalysis, SessionInfo,
};

/// Defines errors that can occur within the actor system.
#[derive(Debug, thiserror::Error, Serialize, Clone)]
pub enum ActorError {
    /// An error originating from the LLM actor.
    #[error("LLM request failed: {0}")]
    LlmError(String),
    /// An error originating from the RAG actor.
    #[error("RAG request failed: {0}")]
    RagError(String),
    /// The vector index (embedding model or database) could not be opened.
    #[error("Lesson index unavailable: {0}")]
    IndexUnavailable(String),
    /// A generic internal error within an actor.
    #[error("Internal system error: {0}")]
    Internal(String),
    /// An error indicating that an actor operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl From<tokio::time::error::Elapsed> for ActorError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ActorError::Timeout(format!("Actor operation timed out: {}", err))
    }
}

// Re-export AppError for convenience
pub use crate::error::AppError;

/// Channel carrying streamed text chunks.
pub type ChunkSender = mpsc::Sender<Result<String, AppError>>;

/// Messages that can be sent to the `LlmActor`.
#[derive(Debug)]
pub enum LlmMessage {
    /// A request to generate a complete text response.
    Complete {
        request: CompletionRequest,
        /// A channel to send the final `String` result back.
        responder: oneshot::Sender<Result<String, AppError>>,
    },
    /// A request to generate a streaming text response.
    StreamComplete {
        request: CompletionRequest,
        /// A channel to send each generated token (chunk) back.
        chunk_sender: ChunkSender,
        /// A channel to signal completion or an error for the whole stream.
        responder: oneshot::Sender<Result<(), AppError>>,
    },
}

/// Messages that can be sent to the `RagActor`.
#[derive(Debug)]
pub enum RagMessage {
    /// A request to embed and store lesson chunks.
    Ingest {
        chunks: Vec<LessonChunk>,
        /// Receives the number of rows written.
        responder: oneshot::Sender<Result<usize, AppError>>,
    },
    /// A request to search the lesson index.
    Search {
        query: String,
        /// The maximum number of results to return.
        limit: usize,
        /// Restrict results to one lesson.
        lesson_id: Option<String>,
        responder: oneshot::Sender<Result<Vec<Passage>, AppError>>,
    },
    /// A request to drop every stored chunk.
    Reset {
        responder: oneshot::Sender<Result<(), AppError>>,
    },
}

/// Messages that can be sent to the `SupervisorActor`.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// One student turn, answered in full.
    Chat {
        thread_id: String,
        message: String,
        lesson_id: Option<String>,
        responder: oneshot::Sender<Result<ChatOutcome, AppError>>,
    },
    /// One student turn whose answer is streamed through `chunk_sender`.
    ChatStream {
        thread_id: String,
        message: String,
        lesson_id: Option<String>,
        chunk_sender: ChunkSender,
        responder: oneshot::Sender<Result<ChatOutcome, AppError>>,
    },
    /// Post-session assessment of a thread.
    Analyze {
        thread_id: String,
        lesson_id: Option<String>,
        topic: Option<String>,
        responder: oneshot::Sender<Result<SessionAnalysis, AppError>>,
    },
    /// Mind-map generation for a lesson.
    Mindmap {
        lesson_id: String,
        topic: Option<String>,
        responder: oneshot::Sender<Result<serde_json::Value, AppError>>,
    },
    SessionInfo {
        thread_id: String,
        responder: oneshot::Sender<Result<SessionInfo, AppError>>,
    },
    ClearSession {
        thread_id: String,
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    /// A command to shut down the supervisor.
    Shutdown,
}
