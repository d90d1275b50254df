//! `@name` mention matching.

use crate::conversation::entities::Conversation;
use crate::core::ids::ParticipantId;

/// The lowercase `@name` token for a participant.
pub fn mention_token(name: &str) -> String {
    format!("@{}", name.trim().to_lowercase())
}

/// Whether `text` contains `@name`, case-insensitively, as a whole token
/// (`@bob` does not match inside `@bobby`).
pub fn mentions(name: &str, text: &str) -> bool {
    let token = mention_token(name);
    let haystack = text.to_lowercase();
    haystack.match_indices(&token).any(|(start, _)| {
        haystack[start + token.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
    })
}

/// A bot reply that mentions its own author is discarded.
pub fn is_self_referential(bot_name: &str, reply: &str) -> bool {
    mentions(bot_name, reply)
}

/// A bare "no" answer: the bot declined to reply.
pub fn is_refusal(reply: &str) -> bool {
    matches!(reply.trim().to_lowercase().as_str(), "no" | "no.")
}

/// Humans mentioned in `text`.
pub fn mentioned_humans(conversation: &Conversation, text: &str) -> Vec<ParticipantId> {
    conversation
        .humans()
        .filter(|h| mentions(h.name(), text))
        .map(|h| h.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::entities::fixtures::*;

    #[test]
    fn test_mentions_case_insensitive() {
        assert!(mentions("Bot", "@bot hi"));
        assert!(mentions("Bot", "hey @BOT, what do you think?"));
        assert!(!mentions("Bot", "Bot hi"));
    }

    #[test]
    fn test_mentions_requires_token_boundary() {
        assert!(!mentions("Bob", "@bobby are you there"));
        assert!(mentions("Bob", "@bobby and @bob"));
        assert!(mentions("Bob", "ask @Bob."));
    }

    #[test]
    fn test_self_reference_and_refusal() {
        assert!(is_self_referential("Sage", "As @sage I think"));
        assert!(!is_self_referential("Sage", "I think so"));
        assert!(is_refusal(" No. "));
        assert!(!is_refusal("Nope, but here is why"));
    }

    #[test]
    fn test_mentioned_humans() {
        let conversation = conversation();
        assert_eq!(mentioned_humans(&conversation, "what do you say @Alice?"), vec![HUMAN]);
        assert!(mentioned_humans(&conversation, "@Bot what do you say").is_empty());
    }
}
