//! Strategy subdomain.
//!
//! - [`kind::StrategyKind`]: the closed set of contributors a cycle can run
//! - [`state::StrategyState`] / [`state::Cooldown`]: message-counted waiting windows
//! - [`outcome::FireResult`]: tagged result every contributor returns
//! - [`analysis`]: pure statistics the proactive strategies decide on
//! - [`discourse`]: parsing of sub-topic classifications

pub mod analysis;
pub mod discourse;
pub mod kind;
pub mod outcome;
pub mod state;
