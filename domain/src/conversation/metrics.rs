//! Engagement metrics for a conversation.

use crate::conversation::entities::Conversation;
use crate::strategy::analysis::mean_and_sample_std;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of how engaged and balanced a conversation is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMetrics {
    /// Words posted by bots in total.
    pub bot_words_total: usize,
    /// Average words per bot message.
    pub bot_words_per_utterance: f64,
    /// Sample std of per-participant word counts as a percentage of the mean.
    /// Lower is more even; 0 when undefined.
    pub evenness: f64,
}

impl ConversationMetrics {
    pub fn compute(conversation: &Conversation) -> Self {
        let bot_counts: Vec<usize> = conversation
            .messages
            .iter()
            .filter(|m| conversation.is_bot_message(m))
            .map(|m| m.word_count())
            .collect();

        let bot_words_total: usize = bot_counts.iter().sum();
        let bot_words_per_utterance = if bot_counts.is_empty() {
            0.0
        } else {
            bot_words_total as f64 / bot_counts.len() as f64
        };

        let mut per_participant: BTreeMap<_, usize> = BTreeMap::new();
        for message in &conversation.messages {
            *per_participant.entry(message.author).or_default() += message.word_count();
        }
        let counts: Vec<f64> = per_participant.values().map(|&c| c as f64).collect();
        let (mean, std) = mean_and_sample_std(&counts);
        let evenness = if mean == 0.0 { 0.0 } else { std / mean * 100.0 };

        Self {
            bot_words_total,
            bot_words_per_utterance,
            evenness,
        }
    }
}
