//! Checks a detailed explanation against the lesson it should be based on.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};

use super::{bool_field, number_field, parse_json_object, text_field, JsonObject};
use super::prompts::{self, VALIDATION_PROMPT, VALIDATOR_SYSTEM_PROMPT};
use crate::actors::traits::LlmActor;
use crate::brain::intent::ResponseMode;
use crate::models::CompletionRequest;

const DEFAULT_CONFIDENCE: u8 = 70;
const FAILURE_CONFIDENCE: u8 = 50;

/// Verdict of the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// 0 to 100.
    pub confidence: u8,
    pub issues: Vec<String>,
    pub suggestions: String,
    pub corrected_answer: String,
}

/// Validation only runs on deep explanations.
pub fn should_validate(mode: ResponseMode) -> bool {
    mode == ResponseMode::Deep
}

/// Asks the model to check `answer` against `context`.
///
/// Never fails: missing fields are defaulted and any error yields a report
/// that accepts the answer with confidence 50.
#[instrument(skip(llm, answer, context))]
pub async fn validate<L>(llm: &L, model: &str, question: &str, answer: &str, context: &str) -> ValidationReport
where
    L: LlmActor + ?Sized,
{
    let prompt = prompts::render(
        VALIDATION_PROMPT,
        &[("context", context), ("question", question), ("answer", answer)],
    );
    let request = CompletionRequest::new(model, prompt)
        .with_system(VALIDATOR_SYSTEM_PROMPT)
        .json();

    let outcome = match llm.complete(request).await {
        Ok(reply) => parse_report(&reply, answer).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    outcome.unwrap_or_else(|reason| {
        warn!("Validation failed, accepting the answer: {}", reason);
        ValidationReport {
            is_valid: true,
            confidence: FAILURE_CONFIDENCE,
            issues: vec![format!("Không thể validate: {}", reason)],
            suggestions: String::new(),
            corrected_answer: answer.to_string(),
        }
    })
}

fn parse_report(reply: &str, answer: &str) -> Result<ValidationReport, serde_json::Error> {
    let object = parse_json_object(reply)?;

    Ok(ValidationReport {
        is_valid: bool_field(&object, "is_valid").unwrap_or(true),
        confidence: number_field(&object, "confidence")
            .map(|c| c.clamp(0.0, 100.0).round() as u8)
            .unwrap_or(DEFAULT_CONFIDENCE),
        issues: issues_field(&object),
        suggestions: text_field(&object, "suggestions").unwrap_or_default(),
        corrected_answer: text_field(&object, "corrected_answer").unwrap_or_else(|| answer.to_string()),
    })
}

/// Issues as text. Models sometimes send objects or a single string.
fn issues_field(object: &JsonObject) -> Vec<String> {
    match object.get("issues") {
        Some(Value::Array(items)) => items.iter().filter_map(issue_text).collect(),
        Some(Value::String(issue)) if !issue.trim().is_empty() => vec![issue.clone()],
        _ => Vec::new(),
    }
}

fn issue_text(item: &Value) -> Option<String> {
    match item {
        Value::Null => None,
        Value::String(issue) => Some(issue.clone()),
        Value::Object(fields) => ["description", "issue", "message"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| Some(item.to_string())),
        other => Some(other.to_string()),
    }
}
