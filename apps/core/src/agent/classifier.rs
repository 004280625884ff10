//! Maps a question onto the curriculum when a short answer looks unsure.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{number_field, parse_json_object, text_field};
use super::prompts::{self, CLASSIFIER_PROMPT, CLASSIFIER_SYSTEM_PROMPT};
use super::responder::CONFIDENCE_THRESHOLD;
use crate::actors::traits::LlmActor;
use crate::brain::curriculum;
use crate::models::CompletionRequest;

const DEFAULT_CONFIDENCE: f32 = 0.5;
const FAILURE_CONFIDENCE: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Scope {
    #[default]
    #[serde(rename = "IN-SCOPE")]
    InScope,
    #[serde(rename = "OUT-OF-SCOPE")]
    OutOfScope,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::InScope => "IN-SCOPE",
            Scope::OutOfScope => "OUT-OF-SCOPE",
        }
    }

    /// Reads a scope label, ignoring case and `_`/space separators.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().replace(['_', ' '], "-").as_str() {
            "IN-SCOPE" => Some(Scope::InScope),
            "OUT-OF-SCOPE" => Some(Scope::OutOfScope),
            _ => None,
        }
    }
}

/// Where a question sits in the curriculum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub topic: Option<String>,
    pub lesson_id: Option<String>,
    pub classification: Scope,
    pub confidence: f32,
    pub reasoning: Option<String>,
}

impl Classification {
    pub fn is_out_of_scope(&self) -> bool {
        self.classification == Scope::OutOfScope
    }
}

/// Whether an answer with this confidence should be classified.
pub fn needs_classification(confidence: f32) -> bool {
    confidence < CONFIDENCE_THRESHOLD
}

/// Classifies `query` against the curriculum.
///
/// Never fails: an unusable reply is treated as in scope with confidence 0.4.
#[instrument(skip(llm))]
pub async fn classify<L>(llm: &L, model: &str, query: &str) -> Classification
where
    L: LlmActor + ?Sized,
{
    let curriculum_text = curriculum::format_for_prompt();
    let prompt = prompts::render(
        CLASSIFIER_PROMPT,
        &[("curriculum", &curriculum_text), ("question", query)],
    );
    let request = CompletionRequest::new(model, prompt)
        .with_system(CLASSIFIER_SYSTEM_PROMPT)
        .json();

    let outcome = match llm.complete(request).await {
        Ok(reply) => parse_classification(&reply).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match outcome {
        Ok(result) => {
            info!(
                classification = ?result.classification,
                confidence = result.confidence,
                topic = result.topic.as_deref().unwrap_or("-"),
                "Question classified"
            );
            result
        }
        Err(reason) => {
            warn!("Classification failed, assuming in scope: {}", reason);
            Classification {
                topic: Some("Unknown".to_string()),
                lesson_id: None,
                classification: Scope::InScope,
                confidence: FAILURE_CONFIDENCE,
                reasoning: Some(format!("Classification error: {}", reason)),
            }
        }
    }
}

fn parse_classification(reply: &str) -> Result<Classification, serde_json::Error> {
    let object = parse_json_object(reply)?;

    Ok(Classification {
        topic: text_field(&object, "topic"),
        lesson_id: text_field(&object, "lesson_id").filter(|id| !id.trim().is_empty()),
        classification: text_field(&object, "classification")
            .and_then(|label| Scope::parse(&label))
            .unwrap_or_default(),
        confidence: number_field(&object, "confidence")
            .map(|c| (c as f32).clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE),
        reasoning: text_field(&object, "reasoning"),
    })
}
