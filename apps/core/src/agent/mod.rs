//! # Agent Module
//!
//! Prompt-driven tools built on the hosted chat model. Each tool formats a
//! template, calls an [`LlmActor`](crate::actors::traits::LlmActor) and turns
//! the reply into a typed result, falling back to a safe default when the
//! model's JSON cannot be used.
//!
//! ## Components
//! - `prompts`: templates and rendering helpers
//! - `responder`: short answers, optionally with a confidence score
//! - `explainer`: step-by-step explanations
//! - `validator`: checks an explanation against the lesson
//! - `classifier`: maps a question onto the curriculum
//! - `summarizer`: compacts long conversation histories
//! - `analyzer`: end-of-session report
//! - `mindmap`: React Flow mind-map generation

pub mod analyzer;
pub mod classifier;
pub mod explainer;
pub mod mindmap;
pub mod prompts;
pub mod responder;
pub mod summarizer;
pub mod validator;

use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

/// Parses a model reply that should be a JSON object.
///
/// Tolerates a surrounding Markdown code fence, which some models add even in
/// JSON mode.
pub fn parse_json_object(reply: &str) -> Result<JsonObject, serde_json::Error> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|inner| inner.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(body)
}

// Field readers for model replies. A field of the wrong type reads as
// missing so that only that field falls back to its default.

pub fn text_field(object: &JsonObject, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Numbers sent as strings (`"85"`, `"0.9"`) are accepted.
pub fn number_field(object: &JsonObject, key: &str) -> Option<f64> {
    match object.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn bool_field(object: &JsonObject, key: &str) -> Option<bool> {
    match object.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().to_lowercase().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_fenced_json() {
        let plain = parse_json_object(r#"{"answer": "4 là số chẵn"}"#).unwrap();
        assert_eq!(plain["answer"], "4 là số chẵn");

        let fenced = parse_json_object("```json\n{\"confidence\": 0.9}\n```").unwrap();
        assert_eq!(fenced["confidence"], 0.9);
    }

    #[test]
    fn test_field_readers_tolerate_loose_types() {
        let object = parse_json_object(
            r#"{"a": "chữ", "n": 85, "s": " 0.9 ", "b": "False", "bad": [1], "t": true}"#,
        )
        .unwrap();

        assert_eq!(text_field(&object, "a").as_deref(), Some("chữ"));
        assert_eq!(text_field(&object, "n"), None);
        assert_eq!(number_field(&object, "n"), Some(85.0));
        assert_eq!(number_field(&object, "s"), Some(0.9));
        assert_eq!(number_field(&object, "a"), None);
        assert_eq!(bool_field(&object, "b"), Some(false));
        assert_eq!(bool_field(&object, "t"), Some(true));
        assert_eq!(bool_field(&object, "bad"), None);
        assert_eq!(number_field(&object, "missing"), None);
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(parse_json_object("[1, 2]").is_err());
        assert!(parse_json_object("Cô nghĩ là số chẵn").is_err());
    }
}
