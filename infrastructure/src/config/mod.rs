//! Configuration file loading for polybot
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `POLYBOT_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./polybot.toml` or `./.polybot.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/polybot/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileBotConfig, FileChimeInConfig, FileCompletionConfig,
    FileConfig, FileConversationConfig, FileEncourageConfig, FileFallbackConfig,
    FileLoggingConfig, FileResolveConfig, FileStrategiesConfig, FileSummarizeConfig,
    FileTransitionConfig, FileTurnConfig,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
