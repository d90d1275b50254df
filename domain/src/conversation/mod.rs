//! Conversation subdomain: participants, messages, sub-topics and the
//! conversation aggregate that every orchestration cycle reads from.

pub mod entities;
pub mod memories;
pub mod metrics;
pub mod participant;
pub mod sub_topic;
