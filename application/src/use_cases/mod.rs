//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod detectors;
pub mod engine;
pub mod fallback;
pub mod generation;
pub mod memories;
pub mod orchestrator;
pub mod shared;
pub mod strategies;
pub mod synthesis;
