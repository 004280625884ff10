//! Rule-based student level assessment from a rendered conversation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker that starts every student line of a rendered conversation.
pub const STUDENT_PREFIX: &str = "Học sinh:";

/// Phrases that signal a student asking for depth.
pub const DEEP_QUESTION_KEYWORDS: [&str; 6] =
    ["giải thích", "chi tiết", "tại sao", "như thế nào", "ví dụ", "làm sao"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for StudentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StudentLevel::Beginner => "Beginner",
            StudentLevel::Intermediate => "Intermediate",
            StudentLevel::Advanced => "Advanced",
        };
        write!(f, "{}", label)
    }
}

/// Level plus a short Vietnamese justification for the progress report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelAssessment {
    pub level: StudentLevel,
    pub reason: String,
    pub question_count: usize,
    pub deep_question_count: usize,
}

/// Assesses a conversation rendered as `Học sinh:` / `Trợ giảng:` lines.
///
/// Fewer than 3 questions is `Beginner`; 7 or more questions, or at least 3
/// deep-question keywords, is `Advanced`; anything else is `Intermediate`.
pub fn assess_level(conversation_history: &str) -> LevelAssessment {
    let question_count = conversation_history.matches(STUDENT_PREFIX).count();
    let lowered = conversation_history.to_lowercase();
    let deep_question_count = DEEP_QUESTION_KEYWORDS
        .iter()
        .filter(|k| lowered.contains(*k))
        .count();

    let (level, reason) = if question_count < 3 {
        (
            StudentLevel::Beginner,
            format!(
                "Học sinh mới hỏi {} câu, chưa thể hiện sự tích cực học hỏi",
                question_count
            ),
        )
    } else if question_count >= 7 || deep_question_count >= 3 {
        (
            StudentLevel::Advanced,
            format!(
                "Học sinh đã hỏi {} câu, trong đó có {} câu hỏi sâu, thể hiện sự chủ động và ham học hỏi cao",
                question_count, deep_question_count
            ),
        )
    } else {
        (
            StudentLevel::Intermediate,
            format!(
                "Học sinh đã hỏi {} câu, thể hiện sự tích cực học hỏi ở mức trung bình",
                question_count
            ),
        )
    };

    LevelAssessment {
        level,
        reason,
        question_count,
        deep_question_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(questions: &[&str]) -> String {
        questions
            .iter()
            .map(|q| format!("Học sinh: {}\nTrợ giảng: Cô trả lời nhé.", q))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_few_questions_is_beginner() {
        let result = assess_level(&conversation(&["Số chẵn là gì?", "Tại sao vậy cô?"]));
        assert_eq!(result.level, StudentLevel::Beginner);
        assert_eq!(result.question_count, 2);
        assert!(result.reason.contains("mới hỏi 2 câu"));
    }

    #[test]
    fn test_many_questions_is_advanced() {
        let questions = ["a?"; 7];
        let result = assess_level(&conversation(&questions));
        assert_eq!(result.level, StudentLevel::Advanced);
    }

    #[test]
    fn test_deep_keywords_make_advanced() {
        let result = assess_level(&conversation(&[
            "Tại sao 8 là số chẵn?",
            "Cô giải thích chi tiết hơn được không?",
            "Cho em ví dụ khác",
        ]));
        assert_eq!(result.level, StudentLevel::Advanced);
        assert!(result.deep_question_count >= 3);
    }

    #[test]
    fn test_middle_ground_is_intermediate() {
        let result = assess_level(&conversation(&["Số 5 chẵn không?", "Còn số 6?", "Số 10 thì sao?"]));
        assert_eq!(result.level, StudentLevel::Intermediate);
        assert!(result.reason.contains("mức trung bình"));
    }

    #[test]
    fn test_empty_history_is_beginner() {
        assert_eq!(assess_level("").level, StudentLevel::Beginner);
    }
}
