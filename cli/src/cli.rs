//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for polybot
#[derive(Parser, Debug)]
#[command(name = "polybot")]
#[command(author, version, about = "Chat with a group of LLM bots that take turns like people do")]
#[command(long_about = r#"
polybot opens a conversation between you and the bots listed in the
configuration. After every message, each enabled strategy decides whether a
bot should speak: mentions, open questions, summaries, encouraging quiet
participants, moving on from settled sub-topics and more. When nobody speaks
for a while, a bot may chime in.

Configuration files are loaded from (in priority order):
1. POLYBOT_* environment variables (e.g. POLYBOT_COMPLETION__PROVIDER=openai)
2. --config <path>     Explicit config file
3. ./polybot.toml      Project-level config
4. ~/.config/polybot/config.toml   Global config

Example:
  polybot
  polybot --as alice -v
  polybot --config team.toml --transcript-dir ./transcripts
"#)]
pub struct Cli {
    /// Human participant you type as (defaults to the first configured human)
    #[arg(long = "as", value_name = "NAME")]
    pub speaker: Option<String>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Write daily rolling diagnostic logs into this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Write JSONL conversation transcripts into this directory
    #[arg(long, value_name = "DIR")]
    pub transcript_dir: Option<PathBuf>,
}
