//! Synthesis
//!
//! Merges several candidate texts for one bot into a single message. The
//! candidates are presented as the bot's own draft turns after the
//! transcript, followed by a merge instruction.

use crate::ports::completion::{CompletionRequest, GenerationParams};
use crate::use_cases::generation::Generator;
use polybot_domain::prompt::utterance::transcript;
use polybot_domain::{
    ContributorError, Conversation, Participant, PromptTemplate, Role, Utterance,
    is_self_referential,
};
use std::sync::Arc;
use tracing::info;

pub struct Synthesizer {
    generator: Arc<Generator>,
    memory_limit: usize,
}

impl Synthesizer {
    pub fn new(generator: Arc<Generator>, memory_limit: usize) -> Self {
        Self {
            generator,
            memory_limit,
        }
    }

    /// Merge `candidates` into one message for `bot`. A single candidate is
    /// returned unchanged without a completion call.
    pub async fn synthesize(
        &self,
        conversation: &Conversation,
        bot: &Participant,
        candidates: &[String],
    ) -> Result<String, ContributorError> {
        let Some(profile) = bot.as_bot() else {
            return Err(ContributorError::Fatal(format!(
                "{} is not a bot",
                bot.name()
            )));
        };
        match candidates {
            [] => return Err(ContributorError::Fatal("Nothing to synthesize".to_string())),
            [single] => return Ok(single.clone()),
            _ => {}
        }

        let mut utterances = vec![Utterance::system(PromptTemplate::bot_system(
            conversation,
            profile,
            self.memory_limit,
        ))];
        utterances.extend(transcript(conversation, &conversation.messages));
        utterances.extend(
            candidates
                .iter()
                .map(|c| Utterance::new(Role::Assistant, profile.name.clone(), c.clone())),
        );
        utterances.push(Utterance::instruction(PromptTemplate::synthesis_instruction(
            &profile.name,
            candidates.len(),
        )));

        let params = GenerationParams::new(profile.model.clone(), profile.temperature);
        let merged = self
            .generator
            .complete(CompletionRequest::new(utterances, params))
            .await?;

        if is_self_referential(&profile.name, &merged) {
            return Err(ContributorError::SelfReferential(profile.name.clone()));
        }
        info!(
            "[Synthesis] Merged {} candidates for {}",
            candidates.len(),
            profile.name
        );
        Ok(merged)
    }
}
