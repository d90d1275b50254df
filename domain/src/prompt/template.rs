//! Prompt templates for bot generation and conversation analysis

use crate::conversation::entities::Conversation;
use crate::conversation::participant::BotProfile;
use crate::conversation::sub_topic::SubTopic;
use crate::prompt::intent::Intent;

/// Templates for every completion the orchestrator requests
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt establishing the bot's persona inside the group.
    pub fn bot_system(
        conversation: &Conversation,
        bot: &BotProfile,
        memory_limit: usize,
    ) -> String {
        let mut prompt = format!(
            r#"You are {name}, taking part in a group chat.
Other bots in the chat: {bots}.
Humans in the chat: {humans}.
Write only your own next message, as {name}. Keep it short and conversational.
Address someone with @name only when you really want them to answer.
Never mention yourself with @{name}.

{persona}"#,
            name = bot.name,
            bots = list_or_none(
                conversation
                    .bot_names()
                    .into_iter()
                    .filter(|n| *n != bot.name)
                    .collect()
            ),
            humans = list_or_none(conversation.human_names()),
            persona = bot.prompt,
        );

        let memories = bot.recent_memories(memory_limit);
        if !memories.is_empty() {
            prompt.push_str("\n\nThings you remember from earlier conversations:\n");
            for memory in memories {
                prompt.push_str(&format!("- {}\n", memory));
            }
        }

        if let Some(summary) = &conversation.summary.text {
            prompt.push_str(&format!("\n\nSummary of the discussion so far:\n{}", summary));
        }

        prompt
    }

    /// Instruction appended after the transcript for a given intent.
    pub fn instruction(intent: &Intent, bot_name: &str) -> String {
        match intent {
            Intent::Mention => format!(
                "{bot_name}, you were mentioned in the conversation. Reply to the message that mentioned you. \
If you have nothing to add, answer with just \"no\"."
            ),
            Intent::Indirect => format!(
                "{bot_name}, someone asked the group a question. Answer it briefly from your point of view."
            ),
            Intent::Encourage { lurkers } => format!(
                "{bot_name}, some participants have been quiet: {}. Invite them into the discussion \
by name with a friendly, low-pressure question related to the current topic.",
                lurkers.join(", ")
            ),
            Intent::Transition => format!(
                "{bot_name}, interest in the current topic is fading. Suggest a new, related sub-topic \
that has not been discussed yet and ask the group what they think."
            ),
            Intent::Resolve => format!(
                "{bot_name}, the discussion seems stuck on the same point. Help the group reach a \
conclusion: restate the positions fairly and propose a way forward."
            ),
            Intent::ChimeInRepetition => format!(
                "{bot_name}, the conversation is repeating itself. Chime in with a fresh insight \
or a question that moves it forward."
            ),
            Intent::ChimeInSilence => format!(
                "{bot_name}, nobody has spoken for a while. Chime in to restart the conversation \
with a short remark or question about the topic."
            ),
        }
    }

    /// Instruction merging several drafts into a single message.
    pub fn synthesis_instruction(bot_name: &str, drafts: usize) -> String {
        format!(
            r#"{bot_name}, your last {drafts} messages above are drafts written for different reasons.
Merge them into ONE natural message that keeps every important point.
Do not mention that you are merging drafts. Write only the final message."#
        )
    }

    /// System prompt for the question classifier.
    pub fn question_classifier_system() -> &'static str {
        r#"You classify chat messages. Decide whether the message is a genuine question that
invites an answer from the group (not rhetorical, not addressed to one specific person).
Respond only with JSON: {"is_question": true} or {"is_question": false}."#
    }

    pub fn question_classifier_prompt(text: &str) -> String {
        format!("Message:\n{}", text)
    }

    /// System prompt for the sub-topic tracker.
    pub fn sub_topic_system() -> &'static str {
        r#"You are a discussion analyst following a group conversation.
You keep track of the sub-topics of the discussion and how far each one has been discussed."#
    }

    /// Ask for one `name, status` line per sub-topic.
    pub fn sub_topic_prompt(tracked: &[SubTopic]) -> String {
        let known = if tracked.is_empty() {
            "(none yet)".to_string()
        } else {
            tracked
                .iter()
                .map(|t| format!("{}, {}", t.name, t.status))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!(
            r#"Known sub-topics:
{known}

Update the list from the recent messages. Add new sub-topics when they appear.
Output one line per sub-topic, formatted exactly as:
<sub-topic name>, <status>
where <status> is one of: Not Discussed, Being Discussed, Well Discussed.
Output nothing else."#
        )
    }

    /// Ask for a running summary addressed to `names`.
    pub fn summarize_prompt(names: &[&str], previous: Option<&str>) -> String {
        let mut prompt = format!(
            "Write a short take-home summary of the discussion for {}. \
Cover each sub-topic and what each participant contributed.",
            names.join(", ")
        );
        if let Some(previous) = previous {
            prompt.push_str(&format!(
                "\nUpdate this previous summary instead of starting over:\n{}",
                previous
            ));
        }
        prompt
    }

    /// Ask `bot_name` for the facts worth keeping from the whole conversation.
    pub fn core_memories_prompt(conversation: &Conversation, bot_name: &str) -> String {
        let transcript = conversation
            .messages
            .iter()
            .map(|m| {
                let author = conversation.author(m).map(|p| p.name()).unwrap_or("unknown");
                format!("{}: {}", author, m.text)
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            r#"You are {bot_name}. The group conversation below has ended.
Pick the few facts you should remember for future conversations: what you learned
about the other participants, their preferences and anything they asked you to keep in mind.
Write each memory as one short sentence.
Respond only with JSON: {{"core_memories": ["...", "..."]}}

Conversation:
{transcript}"#
        )
    }
}

fn list_or_none(names: Vec<&str>) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::entities::fixtures::*;
    use crate::conversation::sub_topic::SubTopicStatus;

    #[test]
    fn test_bot_system_includes_roster_and_memories() {
        let mut conversation = conversation();
        conversation.summary.text = Some("They talked about tea.".into());
        let profile = conversation
            .participant(BOT)
            .and_then(|p| p.as_bot())
            .unwrap()
            .clone()
            .with_memories(vec!["old".into(), "alice likes tea".into()]);

        let prompt = PromptTemplate::bot_system(&conversation, &profile, 1);
        assert!(prompt.contains("You are Bot"));
        assert!(prompt.contains("Humans in the chat: alice."));
        assert!(prompt.contains("Other bots in the chat: none."));
        assert!(prompt.contains("- alice likes tea"));
        assert!(!prompt.contains("- old"));
        assert!(prompt.contains("They talked about tea."));
        assert!(prompt.contains("You are helpful."));
    }

    #[test]
    fn test_encourage_names_lurkers() {
        let intent = Intent::Encourage {
            lurkers: vec!["bob".into(), "carol".into()],
        };
        let text = PromptTemplate::instruction(&intent, "Bot");
        assert!(text.contains("bob, carol"));
    }

    #[test]
    fn test_sub_topic_prompt_lists_known_topics() {
        let topics = vec![SubTopic::new("tea", SubTopicStatus::BeingDiscussed, base_time())];
        let prompt = PromptTemplate::sub_topic_prompt(&topics);
        assert!(prompt.contains("tea, Being Discussed"));
        assert!(PromptTemplate::sub_topic_prompt(&[]).contains("(none yet)"));
    }

    #[test]
    fn test_core_memories_prompt_renders_transcript() {
        let mut conversation = conversation();
        push(&mut conversation, HUMAN, "I only drink green tea");
        push(&mut conversation, BOT, "Noted!");

        let prompt = PromptTemplate::core_memories_prompt(&conversation, "Bot");
        assert!(prompt.starts_with("You are Bot."));
        assert!(prompt.contains("alice: I only drink green tea\nBot: Noted!"));
        assert!(prompt.contains(r#"{"core_memories": ["#));
    }
}
