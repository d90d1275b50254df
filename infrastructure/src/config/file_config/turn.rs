//! Turn-taking configuration from TOML (`[turn]` and `[fallback]` sections)

use polybot_domain::{FallbackDelays, TurnPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTurnConfig {
    pub window: usize,
    pub min_human_fraction: f64,
    pub new_chat_grace: usize,
    pub double_texting: bool,
    /// Omit to let a bot own any share of the window.
    pub max_bot_replies_in_window: Option<usize>,
}

impl Default for FileTurnConfig {
    fn default() -> Self {
        Self::from(TurnPolicy::default())
    }
}

impl From<TurnPolicy> for FileTurnConfig {
    fn from(policy: TurnPolicy) -> Self {
        Self {
            window: policy.window,
            min_human_fraction: policy.min_human_fraction,
            new_chat_grace: policy.new_chat_grace,
            double_texting: policy.double_texting,
            max_bot_replies_in_window: policy.max_bot_replies_in_window,
        }
    }
}

impl FileTurnConfig {
    pub fn to_policy(&self) -> TurnPolicy {
        TurnPolicy {
            window: self.window,
            min_human_fraction: self.min_human_fraction,
            new_chat_grace: self.new_chat_grace,
            double_texting: self.double_texting,
            max_bot_replies_in_window: self.max_bot_replies_in_window,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFallbackConfig {
    /// Silence tolerated after a bot message.
    pub after_bot_seconds: u64,
    /// Silence tolerated after a human message.
    pub after_human_seconds: u64,
}

impl Default for FileFallbackConfig {
    fn default() -> Self {
        let delays = FallbackDelays::default();
        Self {
            after_bot_seconds: delays.after_bot.as_secs(),
            after_human_seconds: delays.after_human.as_secs(),
        }
    }
}

impl FileFallbackConfig {
    pub fn to_delays(&self) -> FallbackDelays {
        FallbackDelays {
            after_bot: Duration::from_secs(self.after_bot_seconds),
            after_human: Duration::from_secs(self.after_human_seconds),
        }
    }
}
