//! Domain layer for polybot
//!
//! This crate contains the conversation model and every pure decision the
//! orchestrator makes. It has no dependencies on infrastructure or I/O.
//!
//! # Core Concepts
//!
//! ## Turn taking
//!
//! Bots never speak first, never double-text unless allowed, and back off
//! when humans go quiet ([`TurnGate`]).
//!
//! ## Strategies
//!
//! Reactive detectors (mentions, open questions) and proactive strategies
//! (Summarize, Encourage, Transition, Resolve, Chime-in) each return a
//! [`FireResult`]. Their statistical triggers live in [`strategy::analysis`].

pub mod conversation;
pub mod core;
pub mod detection;
pub mod prompt;
pub mod strategy;
pub mod turn;

// Re-export commonly used types
pub use conversation::{
    entities::{Conversation, Message, Summary},
    memories::{MIN_MESSAGES_FOR_MEMORIES, parse_core_memories},
    metrics::ConversationMetrics,
    participant::{BotBehavior, BotProfile, DEFAULT_BOT_TEMPERATURE, Participant, ParticipantKind},
    sub_topic::{SubTopic, SubTopicStatus},
};
pub use core::{
    error::DomainError,
    ids::{ConversationId, MessageId, ParticipantId},
    model::Model,
};
pub use detection::{
    mention::{is_refusal, is_self_referential, mention_token, mentioned_humans, mentions},
    question::parse_question_verdict,
};
pub use prompt::{Intent, PromptTemplate, Role, Utterance};
pub use strategy::{
    analysis::{ActivityWindow, LurkerParams},
    discourse::{DiscourseUpdate, parse_sub_topic_lines},
    kind::StrategyKind,
    outcome::{ContributorError, FireResult, NoFireReason, PostEffect, Proposal},
    state::{Cooldown, StrategyState},
};
pub use turn::{
    delay::FallbackDelays,
    gate::{TurnDecision, TurnDenial, TurnGate, TurnPolicy},
};
