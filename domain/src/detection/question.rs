//! Verdicts of the question classifier.

use serde::Deserialize;

#[derive(Deserialize)]
struct Verdict {
    #[serde(alias = "question", alias = "isQuestion")]
    is_question: bool,
}

/// Read the classifier answer: a JSON object such as
/// `{"is_question": true}` or a bare yes/no. `None` when unreadable.
pub fn parse_question_verdict(text: &str) -> Option<bool> {
    let trimmed = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(verdict) = serde_json::from_str::<Verdict>(trimmed) {
        return Some(verdict.is_question);
    }

    match trimmed.trim_end_matches('.').to_lowercase().as_str() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}
