//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for daily rolling diagnostic logs. Stderr only when unset.
    pub dir: Option<PathBuf>,
    /// Directory for JSONL conversation transcripts. Disabled when unset.
    pub transcript_dir: Option<PathBuf>,
}
