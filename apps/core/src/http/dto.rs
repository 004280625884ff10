//! Request and response bodies of the HTTP API.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::brain::{ResponseMode, StudentLevel};
use crate::error::AppError;
use crate::models::Lesson;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LessonsResponse {
    pub lessons: Vec<Lesson>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::Borrowed("must not be empty"));
        return Err(error);
    }
    Ok(())
}

/// Validates a request body. Failures are client errors (400).
pub fn check<T: Validate>(request: &T) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(custom(function = "not_blank"))]
    pub thread_id: String,
    #[validate(custom(function = "not_blank"))]
    pub user_message: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub lesson_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub intent: ResponseMode,
    pub thread_id: String,
}

/// One server-sent event of `/chat/stream`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Chunk {
        chunk: String,
        done: bool,
    },
    Done {
        chunk: String,
        done: bool,
        thread_id: String,
    },
    Error {
        error: String,
    },
}

impl StreamEvent {
    pub fn chunk(text: String) -> Self {
        StreamEvent::Chunk { chunk: text, done: false }
    }

    pub fn done(thread_id: String) -> Self {
        StreamEvent::Done {
            chunk: String::new(),
            done: true,
            thread_id,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzerRequest {
    #[validate(custom(function = "not_blank"))]
    pub thread_id: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzerResponse {
    pub analysis: String,
    pub level: StudentLevel,
    pub level_reason: String,
    pub thread_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MindmapRequest {
    #[validate(custom(function = "not_blank"))]
    pub lesson_id: String,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MindmapResponse {
    pub mindmap_data: serde_json::Value,
    pub lesson_id: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(thread_id: &str, user_message: &str, lesson_id: Option<&str>) -> ChatRequest {
        ChatRequest {
            thread_id: thread_id.to_string(),
            user_message: user_message.to_string(),
            lesson_id: lesson_id.map(str::to_string),
        }
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        assert!(check(&chat("t1", "Số chẵn là gì?", None)).is_ok());
        assert!(check(&chat("t1", "Số chẵn là gì?", Some("bai_phan_so"))).is_ok());

        for request in [chat(" ", "a", None), chat("t1", "\n\t", None), chat("t1", "a", Some(""))] {
            assert!(matches!(check(&request), Err(AppError::Validation(_))));
        }

        let err = check(&chat("t1", "  ", None)).unwrap_err();
        assert!(err.to_string().contains("user_message"));
    }

    #[test]
    fn test_analyzer_and_mindmap_bodies() {
        let analyzer = AnalyzerRequest {
            thread_id: "".to_string(),
            lesson_id: None,
            topic: None,
        };
        assert!(matches!(check(&analyzer), Err(AppError::Validation(_))));

        let mindmap = MindmapRequest {
            lesson_id: "bai_hinh_hoc".to_string(),
            topic: None,
        };
        assert!(check(&mindmap).is_ok());
    }
}
