//! Response-mode routing.
//!
//! A keyword scan of the latest student utterance decides whether the tutor
//! gives a short answer or a step-by-step explanation. No model call involved.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phrases that ask for a detailed, worked explanation.
pub const DEEP_KEYWORDS: [&str; 5] = ["giải thích chi tiết", "phân tích", "từng bước", "ví dụ", "cụ thể"];

/// Passages retrieved for a deep explanation.
pub const DEEP_RETRIEVAL_K: usize = 5;
/// Passages retrieved for a short answer.
pub const NORMAL_RETRIEVAL_K: usize = 3;

/// How the tutor should answer a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Short answer grounded in the lesson.
    #[default]
    Normal,
    /// Step-by-step explanation.
    Deep,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Normal => "normal",
            ResponseMode::Deep => "deep",
        }
    }

    /// How many passages to retrieve for this mode.
    pub fn retrieval_k(&self) -> usize {
        match self {
            ResponseMode::Normal => NORMAL_RETRIEVAL_K,
            ResponseMode::Deep => DEEP_RETRIEVAL_K,
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of routing one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub mode: ResponseMode,
    /// Deep keywords found in the utterance, in table order.
    pub matched_keywords: Vec<&'static str>,
    pub retrieval_k: usize,
}

/// Keyword-based router between short answers and detailed explanations.
#[derive(Debug, Clone)]
pub struct IntentRouter {
    keywords: Vec<&'static str>,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentRouter {
    pub fn new() -> Self {
        Self {
            keywords: DEEP_KEYWORDS.to_vec(),
        }
    }

    /// Routes the latest user utterance.
    pub fn route(&self, utterance: &str) -> RouteDecision {
        let text = utterance.trim().to_lowercase();

        let matched_keywords: Vec<&'static str> = if text.is_empty() {
            Vec::new()
        } else {
            self.keywords
                .iter()
                .copied()
                .filter(|keyword| text.contains(keyword))
                .collect()
        };

        let mode = if matched_keywords.is_empty() {
            ResponseMode::Normal
        } else {
            ResponseMode::Deep
        };

        RouteDecision {
            mode,
            matched_keywords,
            retrieval_k: mode.retrieval_k(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_question_is_normal() {
        let router = IntentRouter::new();
        let decision = router.route("Số 45 là số chẵn hay số lẻ?");
        assert_eq!(decision.mode, ResponseMode::Normal);
        assert!(decision.matched_keywords.is_empty());
        assert_eq!(decision.retrieval_k, 3);
    }

    #[test]
    fn test_deep_keywords_switch_mode() {
        let router = IntentRouter::new();

        let decision = router.route("Cô giải thích chi tiết cách đặt tính cộng được không ạ?");
        assert_eq!(decision.mode, ResponseMode::Deep);
        assert_eq!(decision.matched_keywords, vec!["giải thích chi tiết"]);
        assert_eq!(decision.retrieval_k, 5);

        let decision = router.route("Cho em một VÍ DỤ về phân số");
        assert_eq!(decision.mode, ResponseMode::Deep);
    }

    #[test]
    fn test_multiple_keywords_reported_in_order() {
        let router = IntentRouter::new();
        let decision = router.route("Phân tích từng bước giúp em");
        assert_eq!(decision.matched_keywords, vec!["phân tích", "từng bước"]);
    }

    #[test]
    fn test_empty_input_is_normal() {
        let router = IntentRouter::new();
        assert_eq!(router.route("   ").mode, ResponseMode::Normal);
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ResponseMode::Deep).unwrap(), "\"deep\"");
        assert_eq!(ResponseMode::Normal.to_string(), "normal");
    }
}
