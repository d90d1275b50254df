//! Interactive terminal chat
//!
//! Reads the human's lines from stdin, appends them to the store and
//! notifies the engine. Bot posts arrive through the store's broadcast and
//! are printed as they land. Leaving with `/quit` or end of input lets the
//! bots form core memories of the conversation.

use anyhow::{Context, Result};
use colored::Colorize;
use polybot_application::{ConversationStore, EngineEvent, Orchestrator};
use polybot_domain::{Conversation, Message, ParticipantId, StrategyKind};
use polybot_infrastructure::InMemoryConversationStore;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A slash command typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Who,
    Strategies,
    Enable(StrategyKind),
    Disable(StrategyKind),
    Quit,
    Unknown(String),
}

impl Command {
    /// Parse a line starting with `/`. Returns `None` for plain chat lines.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('/')?;
        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };
        let command = match name.to_lowercase().as_str() {
            "help" | "h" | "?" => Command::Help,
            "who" => Command::Who,
            "strategies" | "s" => Command::Strategies,
            "enable" => match argument.parse() {
                Ok(kind) => Command::Enable(kind),
                Err(_) => Command::Unknown(line.to_string()),
            },
            "disable" => match argument.parse() {
                Ok(kind) => Command::Disable(kind),
                Err(_) => Command::Unknown(line.to_string()),
            },
            "quit" | "exit" | "q" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        };
        Some(command)
    }
}

pub struct ChatSession {
    store: Arc<InMemoryConversationStore>,
    events: mpsc::Sender<EngineEvent>,
    conversation: Conversation,
    speaker: ParticipantId,
    memories: Option<Arc<Orchestrator>>,
}

impl ChatSession {
    pub fn new(
        store: Arc<InMemoryConversationStore>,
        events: mpsc::Sender<EngineEvent>,
        conversation: Conversation,
        speaker: ParticipantId,
    ) -> Self {
        Self {
            store,
            events,
            conversation,
            speaker,
            memories: None,
        }
    }

    /// Form core memories through `orchestrator` when the human leaves.
    pub fn with_memories(mut self, orchestrator: Arc<Orchestrator>) -> Self {
        self.memories = Some(orchestrator);
        self
    }

    /// Run until `/quit`, end of input or `shutdown`.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        self.print_welcome();

        let printer = tokio::spawn(print_posts(
            self.store.subscribe(),
            self.conversation.clone(),
            self.speaker,
            shutdown.clone(),
        ));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut left = false;
        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => break,
                line = lines.next_line() => line.context("Failed to read from stdin")?,
            };
            let Some(line) = line else {
                println!("Bye!");
                left = true;
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match Command::parse(line) {
                Some(command) => {
                    if self.handle_command(command).await? {
                        left = true;
                        break;
                    }
                }
                None => self.post(line).await?,
            }
        }

        shutdown.cancel();
        if let Err(e) = printer.await {
            warn!("Printer task failed: {}", e);
        }
        if left {
            self.form_memories().await;
        }
        Ok(())
    }

    async fn form_memories(&self) {
        let Some(orchestrator) = &self.memories else {
            return;
        };
        let id = self.conversation.id;
        let formed = match orchestrator.form_core_memories(id).await {
            Ok(formed) => formed,
            Err(e) => {
                warn!("Failed to form core memories: {}", e);
                return;
            }
        };
        if formed.total() == 0 {
            return;
        }

        let participants = match self.store.participants(id).await {
            Ok(participants) => participants,
            Err(e) => {
                warn!("Failed to read core memories: {}", e);
                return;
            }
        };
        println!("{}", "Core memories formed:".cyan().bold());
        for (bot, count) in &formed.per_bot {
            let Some(profile) = participants
                .iter()
                .find(|p| p.id == *bot)
                .and_then(|p| p.as_bot())
            else {
                continue;
            };
            let start = profile.memories.len().saturating_sub(*count);
            for memory in &profile.memories[start..] {
                println!("  {} {}", format!("{}:", profile.name).yellow(), memory);
            }
        }
    }

    async fn post(&self, text: &str) -> Result<()> {
        let id = self.conversation.id;
        self.store
            .append_message(id, self.speaker, text)
            .await
            .context("Failed to post message")?;
        self.events
            .send(EngineEvent::MessagePosted(id))
            .await
            .context("Chat engine stopped")?;
        Ok(())
    }

    /// Returns `true` when the session should end.
    async fn handle_command(&self, command: Command) -> Result<bool> {
        let id = self.conversation.id;
        match command {
            Command::Quit => {
                println!("Bye!");
                return Ok(true);
            }
            Command::Help => print_help(),
            Command::Who => {
                println!("Humans: {}", self.conversation.human_names().join(", "));
                println!("Bots:   {}", self.conversation.bot_names().join(", "));
            }
            Command::Strategies => {
                let enabled = self.store.enabled_strategies(id).await?;
                for kind in StrategyKind::ALL {
                    let mark = if enabled.contains(&kind) {
                        "on ".green()
                    } else {
                        "off".dimmed()
                    };
                    println!("  [{}] {}", mark, kind);
                }
            }
            Command::Enable(kind) => {
                self.store.set_strategy_enabled(id, kind, true)?;
                println!("{} enabled", kind);
            }
            Command::Disable(kind) => {
                self.store.set_strategy_enabled(id, kind, false)?;
                println!("{} disabled", kind);
            }
            Command::Unknown(line) => {
                println!("Unknown command: {}", line);
                println!("Type /help for available commands");
            }
        }
        Ok(false)
    }

    fn print_welcome(&self) {
        let title = self.conversation.title.as_deref().unwrap_or("polybot");
        println!();
        println!("{}", format!("── {} ──", title).cyan().bold());
        println!(
            "{} {}",
            "Bots:".cyan().bold(),
            self.conversation.bot_names().join(", ")
        );
        let you = self
            .conversation
            .participant(self.speaker)
            .map(|p| p.name())
            .unwrap_or("you");
        println!("{} {}", "You are:".cyan().bold(), you);
        println!("Type a message, or /help for commands.");
        println!();
    }
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  /help, /h, /?          - Show this help");
    println!("  /who                   - List participants");
    println!("  /strategies            - Show enabled strategies");
    println!("  /enable <strategy>     - Enable a strategy");
    println!("  /disable <strategy>    - Disable a strategy");
    println!("  /quit, /exit, /q       - Exit chat");
    println!();
}

async fn print_posts(
    mut posts: broadcast::Receiver<Message>,
    conversation: Conversation,
    speaker: ParticipantId,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = posts.recv() => match received {
                Ok(message) => message,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} message(s) while rendering", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };
        if message.conversation_id != conversation.id || message.author == speaker {
            continue;
        }
        println!("{}", render(&conversation, &message));
    }
}

fn render(conversation: &Conversation, message: &Message) -> String {
    let time = message.timestamp.format("%H:%M");
    match conversation.author(message) {
        Some(author) if author.is_bot() => format!(
            "{} {} {}",
            time.to_string().dimmed(),
            format!("{}:", author.name()).yellow().bold(),
            message.text
        ),
        Some(author) => format!(
            "{} {} {}",
            time.to_string().dimmed(),
            format!("{}:", author.name()).blue().bold(),
            message.text
        ),
        None => format!("{} {}", time.to_string().dimmed(), message.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_are_not_commands() {
        assert_eq!(Command::parse("hello /there"), None);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/q"), Some(Command::Quit));
        assert_eq!(Command::parse("/WHO"), Some(Command::Who));
        assert_eq!(
            Command::parse("/enable chime-in"),
            Some(Command::Enable(StrategyKind::ChimeIn))
        );
        assert_eq!(
            Command::parse("/disable  Summarize "),
            Some(Command::Disable(StrategyKind::Summarize))
        );
        assert_eq!(
            Command::parse("/enable gossip"),
            Some(Command::Unknown("/enable gossip".to_string()))
        );
    }
}
