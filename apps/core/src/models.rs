use serde::{Deserialize, Serialize};

use crate::brain::intent::ResponseMode;
use crate::brain::level::StudentLevel;

/// The author of a message in a tutoring conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Injected context such as a summary of older turns.
    System,
    /// The student.
    User,
    /// The tutor.
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Represents a single message within a conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A lesson transcript available in the transcripts directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// File stem, also stored on every indexed chunk.
    pub lesson_id: String,
    /// File name including the extension.
    pub lesson_name: String,
}

/// A piece of a lesson transcript ready to be embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonChunk {
    pub content: String,
    pub lesson_id: String,
    pub lesson_name: String,
    /// Path of the transcript the chunk came from.
    pub source: String,
}

/// A passage returned by the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub lesson_id: Option<String>,
    /// Vector distance (lower is closer).
    pub score: f32,
}

/// One call to the hosted chat model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    /// Ask the model for a JSON object (`response_format: json_object`).
    pub json_mode: bool,
}

impl CompletionRequest {
    /// A deterministic (temperature 0) plain-text request.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            prompt: prompt.into(),
            temperature: 0.0,
            json_mode: false,
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Result of one chat turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub intent: ResponseMode,
}

/// Snapshot of a conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub thread_id: String,
    pub messages_count: usize,
    pub conversation_history: String,
}

/// End-of-session assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionAnalysis {
    pub analysis: String,
    pub level: StudentLevel,
    pub level_reason: String,
}
