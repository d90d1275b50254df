//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`]: generation models a bot can speak through
//! - [`ids`]: conversation, participant and message identifiers
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod ids;
pub mod model;
