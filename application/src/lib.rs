//! Application layer for polybot
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{
    ChimeInParams, CompletionPolicy, EncourageParams, OrchestratorConfig, ResolveParams,
    StrategyParams, SummarizeParams, TransitionParams,
};
pub use ports::{
    completion::{CompletionError, CompletionRequest, CompletionService, GenerationParams},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    conversation_store::{ConversationStore, MessageOrder, MessageQuery, MessageRange, StoreError},
};
pub use use_cases::engine::{ChatEngine, EngineEvent};
pub use use_cases::fallback::{FallbackFire, FallbackScheduler};
pub use use_cases::memories::{CoreMemoryFormer, FormedMemories};
pub use use_cases::orchestrator::{CycleReport, FallbackOutcome, Orchestrator, OrchestratorError};
pub use use_cases::shared::Contribution;
