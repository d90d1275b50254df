//! Core memories a bot keeps across conversations.

use serde::Deserialize;

/// Conversations shorter than this are not worth remembering.
pub const MIN_MESSAGES_FOR_MEMORIES: usize = 5;

#[derive(Deserialize)]
struct CoreMemories {
    #[serde(alias = "memories", alias = "coreMemories")]
    core_memories: Vec<String>,
}

/// Read the JSON answer `{"core_memories": [...]}`, dropping blank entries.
/// `None` when unreadable.
pub fn parse_core_memories(text: &str) -> Option<Vec<String>> {
    let trimmed = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let parsed: CoreMemories = serde_json::from_str(trimmed).ok()?;
    Some(
        parsed
            .core_memories
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memories() {
        let memories =
            parse_core_memories(r#"{"core_memories": ["alice likes tea", "  ", " bob has a cat "]}"#)
                .unwrap();
        assert_eq!(memories, vec!["alice likes tea", "bob has a cat"]);
    }

    #[test]
    fn test_parse_fenced_memories() {
        let memories = parse_core_memories("```json\n{\"memories\": []}\n```").unwrap();
        assert!(memories.is_empty());
    }

    #[test]
    fn test_unreadable_memories() {
        assert_eq!(parse_core_memories("I remember tea."), None);
        assert_eq!(parse_core_memories(r#"{"core_memories": "tea"}"#), None);
    }
}
