//! Short answers in normal mode.

use serde::Serialize;
use tracing::{instrument, warn};

use super::{number_field, parse_json_object};
use super::prompts::{self, CONFIDENCE_SUFFIX, NORMAL_ANSWER_PROMPT, SYSTEM_PROMPT};
use crate::actors::traits::LlmActor;
use crate::error::AppError;
use crate::models::{ChatMessage, CompletionRequest};

/// Below this confidence a short answer is checked against the curriculum.
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Confidence assumed when the model did not return usable JSON.
const UNSCORED_CONFIDENCE: f32 = 0.5;

/// A short answer together with the model's own confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredAnswer {
    pub answer: String,
    pub confidence: f32,
}

impl ScoredAnswer {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < CONFIDENCE_THRESHOLD
    }
}

/// Builds the plain normal-mode request. Also used by the streaming path.
pub fn answer_request(model: &str, query: &str, context: &str, history: &[ChatMessage]) -> CompletionRequest {
    let history = prompts::history_section(history);
    let prompt = prompts::render(
        NORMAL_ANSWER_PROMPT,
        &[("history", &history), ("context", context), ("question", query)],
    );
    CompletionRequest::new(model, prompt).with_system(SYSTEM_PROMPT)
}

/// Answers briefly from the lesson context.
#[instrument(skip(llm, context, history), fields(context_len = context.len()))]
pub async fn answer<L>(
    llm: &L,
    model: &str,
    query: &str,
    context: &str,
    history: &[ChatMessage],
) -> Result<String, AppError>
where
    L: LlmActor + ?Sized,
{
    llm.complete(answer_request(model, query, context, history)).await
}

/// Answers briefly and asks the model how confident it is.
///
/// A reply that is not the expected JSON is kept as the answer with a
/// confidence of 0.5, which sends it to classification.
#[instrument(skip(llm, context, history), fields(context_len = context.len()))]
pub async fn answer_scored<L>(
    llm: &L,
    model: &str,
    query: &str,
    context: &str,
    history: &[ChatMessage],
) -> Result<ScoredAnswer, AppError>
where
    L: LlmActor + ?Sized,
{
    let history = prompts::history_section(history);
    let template = format!("{}{}", NORMAL_ANSWER_PROMPT, CONFIDENCE_SUFFIX);
    let prompt = prompts::render(
        &template,
        &[("history", &history), ("context", context), ("question", query)],
    );
    let request = CompletionRequest::new(model, prompt).with_system(SYSTEM_PROMPT).json();

    let reply = llm.complete(request).await?;
    Ok(parse_scored(&reply))
}

fn parse_scored(reply: &str) -> ScoredAnswer {
    let fallback = || ScoredAnswer {
        answer: reply.trim().to_string(),
        confidence: UNSCORED_CONFIDENCE,
    };

    let object = match parse_json_object(reply) {
        Ok(object) => object,
        Err(e) => {
            warn!("Scored answer is not JSON, using raw text: {}", e);
            return fallback();
        }
    };

    let Some(answer) = object.get("answer").and_then(|a| a.as_str()) else {
        warn!("Scored answer has no 'answer' field, using raw text");
        return fallback();
    };

    let confidence = number_field(&object, "confidence")
        .map(|c| (c as f32).clamp(0.0, 1.0))
        .unwrap_or(UNSCORED_CONFIDENCE);

    ScoredAnswer {
        answer: answer.to_string(),
        confidence,
    }
}
