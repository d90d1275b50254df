//! Pure conversation statistics used by the proactive strategies.
//!
//! Nothing here talks to a service; every function reads a
//! [`Conversation`] and returns a decision input.

use crate::conversation::entities::Conversation;
use crate::conversation::sub_topic::SubTopicStatus;
use crate::core::ids::ParticipantId;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Which messages count when collecting active participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityWindow {
    All,
    /// Messages strictly after the given time (all when `None`).
    Since(Option<DateTime<Utc>>),
    LastN(usize),
}

/// Per-participant activity inside a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantStats {
    pub participant: ParticipantId,
    pub messages: usize,
    /// Total characters written.
    pub length: usize,
}

/// Thresholds for lurker detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LurkerParams {
    /// Messages considered for the statistics.
    pub long_context: usize,
    /// Messages considered for recent participation.
    pub short_context: usize,
    /// How many sample standard deviations below the mean counts as low.
    pub std_ratio: f64,
    /// A lurker posted fewer than this many messages in the short context.
    pub recent_max: usize,
}

impl Default for LurkerParams {
    fn default() -> Self {
        Self {
            long_context: 50,
            short_context: 10,
            std_ratio: 0.5,
            recent_max: 1,
        }
    }
}

/// Mean and sample (n-1) standard deviation. The deviation is 0 for fewer
/// than two values.
pub fn mean_and_sample_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

/// Distinct authors inside `window`.
pub fn active_participants(
    conversation: &Conversation,
    window: ActivityWindow,
) -> BTreeSet<ParticipantId> {
    let messages = match window {
        ActivityWindow::All => &conversation.messages[..],
        ActivityWindow::Since(since) => conversation.messages_after(since),
        ActivityWindow::LastN(n) => conversation.last_n(n),
    };
    messages.iter().map(|m| m.author).collect()
}

/// Activity of every human participant over the last `window` messages,
/// including humans who stayed silent.
pub fn human_stats(conversation: &Conversation, window: usize) -> Vec<ParticipantStats> {
    let recent = conversation.last_n(window);
    conversation
        .humans()
        .map(|human| {
            let (messages, length) = recent
                .iter()
                .filter(|m| m.author == human.id)
                .fold((0, 0), |(count, len), m| (count + 1, len + m.text.chars().count()));
            ParticipantStats {
                participant: human.id,
                messages,
                length,
            }
        })
        .collect()
}

/// Humans whose frequency and length are both statistically low and who
/// have barely spoken recently.
pub fn find_lurkers(conversation: &Conversation, params: &LurkerParams) -> Vec<ParticipantId> {
    let stats = human_stats(conversation, params.long_context);
    if stats.len() < 2 {
        return Vec::new();
    }

    let frequencies: Vec<f64> = stats.iter().map(|s| s.messages as f64).collect();
    let lengths: Vec<f64> = stats.iter().map(|s| s.length as f64).collect();
    let (freq_mean, freq_std) = mean_and_sample_std(&frequencies);
    let (len_mean, len_std) = mean_and_sample_std(&lengths);
    let freq_floor = freq_mean - params.std_ratio * freq_std;
    let len_floor = len_mean - params.std_ratio * len_std;

    let recent = conversation.last_n(params.short_context);
    stats
        .iter()
        .filter(|s| (s.messages as f64) < freq_floor && (s.length as f64) < len_floor)
        .filter(|s| recent.iter().filter(|m| m.author == s.participant).count() < params.recent_max)
        .map(|s| s.participant)
        .collect()
}

/// The last `threshold` messages exist and share the exact same text.
pub fn is_repetitive(conversation: &Conversation, threshold: usize) -> bool {
    if threshold == 0 || conversation.messages.len() < threshold {
        return false;
    }
    let window = conversation.last_n(threshold);
    window.iter().all(|m| m.text == window[0].text)
}

/// At least `period` messages exist and no sub-topic status changed after
/// the oldest of the last `period` messages.
pub fn is_stagnant(conversation: &Conversation, period: usize) -> bool {
    if period == 0 || conversation.messages.len() < period {
        return false;
    }
    let earliest = conversation.last_n(period)[0].timestamp;
    !conversation
        .sub_topics
        .iter()
        .any(|t| t.status_changed_at.is_some_and(|at| at > earliest))
}

/// Share of ever-active participants who spoke in the last `short_context`
/// messages. `None` while nobody has spoken.
pub fn interest_ratio(conversation: &Conversation, short_context: usize) -> Option<f64> {
    let total = active_participants(conversation, ActivityWindow::All).len();
    if total == 0 {
        return None;
    }
    let recent = active_participants(conversation, ActivityWindow::LastN(short_context)).len();
    Some(recent as f64 / total as f64)
}

/// Nothing is currently being discussed.
pub fn nothing_being_discussed(conversation: &Conversation) -> bool {
    conversation
        .sub_topics_with(SubTopicStatus::BeingDiscussed)
        .next()
        .is_none()
}
