//! Chat engine
//!
//! Drives the [`Orchestrator`] from new-message events and elapsed fallback
//! timers. Cycles of the same conversation never overlap; a cycle that
//! posted is followed by another one so bots can react to each other, up to
//! `max_follow_ups` extra cycles.

use crate::ports::conversation_store::StoreError;
use crate::use_cases::fallback::FallbackFire;
use crate::use_cases::orchestrator::{
    CycleReport, FallbackOutcome, Orchestrator, OrchestratorError,
};
use polybot_domain::{ConversationId, Message, ParticipantId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Inputs of the engine loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A message was appended to the conversation.
    MessagePosted(ConversationId),
}

pub struct ChatEngine {
    orchestrator: Arc<Orchestrator>,
    locks: Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>>,
    max_follow_ups: usize,
}

impl ChatEngine {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let max_follow_ups = orchestrator.config().max_follow_ups;
        Self {
            orchestrator,
            locks: Mutex::new(HashMap::new()),
            max_follow_ups,
        }
    }

    pub fn with_max_follow_ups(mut self, max_follow_ups: usize) -> Self {
        self.max_follow_ups = max_follow_ups;
        self
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    fn lock_for(&self, id: ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(id).or_default())
    }

    /// Append a human message and run the cycles it triggers.
    pub async fn post_human_message(
        &self,
        id: ConversationId,
        author: ParticipantId,
        text: &str,
    ) -> Result<(Message, Vec<CycleReport>), OrchestratorError> {
        let store = self.orchestrator.store();
        let participant = store
            .participants(id)
            .await?
            .into_iter()
            .find(|p| p.id == author);
        if !participant.is_some_and(|p| p.is_human()) {
            return Err(StoreError::UnknownParticipant {
                conversation: id,
                participant: author,
            }
            .into());
        }

        let message = store.append_message(id, author, text).await?;
        let reports = self.notify_message(id).await?;
        Ok((message, reports))
    }

    /// React to a new message in `id`.
    ///
    /// The pending fallback is canceled right away, before waiting for a
    /// running cycle of the same conversation.
    pub async fn notify_message(
        &self,
        id: ConversationId,
    ) -> Result<Vec<CycleReport>, OrchestratorError> {
        self.orchestrator.scheduler().cancel(id);

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.run_cycles(id).await
    }

    /// Handle an elapsed fallback timer.
    pub async fn handle_fire(
        &self,
        fire: FallbackFire,
    ) -> Result<(FallbackOutcome, Vec<CycleReport>), OrchestratorError> {
        let lock = self.lock_for(fire.conversation);
        let _guard = lock.lock().await;

        let outcome = self
            .orchestrator
            .fire_fallback(fire.conversation, fire.origin)
            .await?;
        let reports = match outcome {
            FallbackOutcome::Posted(_) => self.run_cycles(fire.conversation).await?,
            _ => Vec::new(),
        };
        Ok((outcome, reports))
    }

    /// One cycle plus its follow-ups. The caller holds the conversation lock.
    async fn run_cycles(&self, id: ConversationId) -> Result<Vec<CycleReport>, OrchestratorError> {
        let mut reports = Vec::new();
        loop {
            let report = self.orchestrator.run_cycle(id).await?;
            let posted = report.posted_anything();
            reports.push(report);

            if !posted {
                break;
            }
            if reports.len() > self.max_follow_ups {
                info!(
                    "Follow-up limit reached for {} after {} cycle(s)",
                    id,
                    reports.len()
                );
                break;
            }
            debug!("Running follow-up cycle for {}", id);
        }
        Ok(reports)
    }

    /// Consume events and fallback fires until `shutdown` is canceled or
    /// both channels close. Every input is handled on its own task.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<EngineEvent>,
        mut fires: mpsc::UnboundedReceiver<FallbackFire>,
        shutdown: CancellationToken,
    ) {
        info!("Chat engine started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(event) = events.recv() => {
                    let engine = Arc::clone(&self);
                    tokio::spawn(async move {
                        let EngineEvent::MessagePosted(id) = event;
                        if let Err(e) = engine.notify_message(id).await {
                            warn!("Cycle for {} aborted: {}", id, e);
                        }
                    });
                }
                Some(fire) = fires.recv() => {
                    let engine = Arc::clone(&self);
                    tokio::spawn(async move {
                        let id = fire.conversation;
                        if let Err(e) = engine.handle_fire(fire).await {
                            warn!("Fallback for {} aborted: {}", id, e);
                        }
                    });
                }
                else => break,
            }
        }
        self.orchestrator.scheduler().shutdown();
        info!("Chat engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use crate::ports::completion::{CompletionError, CompletionRequest, CompletionService};
    use crate::testing::*;
    use crate::use_cases::fallback::FallbackScheduler;
    use async_trait::async_trait;
    use polybot_domain::{Conversation, StrategyKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn only(strategies: &[StrategyKind]) -> Conversation {
        let mut conversation = conversation();
        conversation.enabled_strategies = strategies.iter().copied().collect();
        conversation
    }

    fn speaker(request: &CompletionRequest) -> &str {
        let system = &request.utterances[0].content;
        if system.starts_with("You are Helper") {
            "Helper"
        } else {
            "Bot"
        }
    }

    fn engine(
        conversation: Conversation,
        completion: ScriptedCompletion,
    ) -> (
        Arc<FakeStore>,
        ChatEngine,
        mpsc::UnboundedReceiver<FallbackFire>,
    ) {
        let store = Arc::new(FakeStore::new(conversation));
        let (scheduler, fires) = FallbackScheduler::new();
        let orchestrator = Orchestrator::new(
            store.clone(),
            Arc::new(completion),
            Arc::new(scheduler),
            OrchestratorConfig::default(),
        );
        (store, ChatEngine::new(Arc::new(orchestrator)), fires)
    }

    #[tokio::test]
    async fn test_bots_answer_each_other_in_follow_ups() {
        let completion = ScriptedCompletion::new(|request| match speaker(request) {
            "Bot" => Ok("Let me ask @Helper".to_string()),
            _ => Ok("Done.".to_string()),
        });
        let (store, engine, _fires) = engine(only(&[StrategyKind::Mention]), completion);

        let (_, reports) = engine
            .post_human_message(CONVERSATION, ALICE, "@Bot can you check?")
            .await
            .unwrap();
        assert_eq!(reports.len(), 3);
        assert!(!reports[2].posted_anything());
        assert_eq!(
            store.texts(),
            vec!["@Bot can you check?", "Let me ask @Helper", "Done."]
        );
    }

    #[tokio::test]
    async fn test_follow_ups_are_bounded() {
        let completion = ScriptedCompletion::new(|request| match speaker(request) {
            "Bot" => Ok("What do you say @Helper".to_string()),
            _ => Ok("And you @Bot".to_string()),
        });
        let (store, engine, _fires) = engine(only(&[StrategyKind::Mention]), completion);
        let engine = engine.with_max_follow_ups(2);

        let (_, reports) = engine
            .post_human_message(CONVERSATION, ALICE, "@Bot hi")
            .await
            .unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(CycleReport::posted_anything));
        assert_eq!(store.texts().len(), 4);
    }

    #[tokio::test]
    async fn test_bots_cannot_post_as_humans() {
        let (_, engine, _fires) = engine(conversation(), ScriptedCompletion::constant("x"));
        let result = engine.post_human_message(CONVERSATION, BOT, "hi").await;
        assert!(matches!(
            result,
            Err(OrchestratorError::Store(StoreError::UnknownParticipant { .. }))
        ));
    }

    #[tokio::test]
    async fn test_quiet_cycle_leaves_fallback_armed() {
        let (store, engine, _fires) = engine(only(&[]), ScriptedCompletion::constant("x"));
        store.seed(ALICE, "hmm");

        let reports = engine.notify_message(CONVERSATION).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].fallback, Some(Duration::from_secs(30)));
        assert!(engine.orchestrator().scheduler().pending(CONVERSATION).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_posts_fallback_chime() {
        let (store, engine, fires) = engine(
            only(&[StrategyKind::ChimeInSilence]),
            ScriptedCompletion::constant("Anyone still here?"),
        );
        store.seed(ALICE, "hmm");

        let engine = Arc::new(engine);
        let (events_tx, events_rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&engine).run(events_rx, fires, shutdown.clone()));

        events_tx
            .send(EngineEvent::MessagePosted(CONVERSATION))
            .await
            .unwrap();
        for _ in 0..120 {
            if store.texts().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        assert_eq!(store.texts(), vec!["hmm", "Anyone still here?"]);

        shutdown.cancel();
        handle.await.unwrap();
    }

    /// Slow classifier that records how many calls overlap.
    #[derive(Default)]
    struct SlowCompletion {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionService for SlowCompletion {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(r#"{"is_question": false}"#.to_string())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cycles_of_one_conversation_never_overlap() {
        let store = Arc::new(FakeStore::new(only(&[StrategyKind::Indirect])));
        store.seed(ALICE, "hmm");
        let completion = Arc::new(SlowCompletion::default());
        let (scheduler, _fires) = FallbackScheduler::new();
        let orchestrator = Orchestrator::new(
            store.clone(),
            completion.clone(),
            Arc::new(scheduler),
            OrchestratorConfig::default(),
        );
        let engine = Arc::new(ChatEngine::new(Arc::new(orchestrator)));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine.notify_message(CONVERSATION).await
            }));
        }
        for handle in handles {
            let reports = handle.await.unwrap().unwrap();
            assert_eq!(reports.len(), 1);
        }

        assert_eq!(completion.calls.load(Ordering::SeqCst), 5);
        assert_eq!(completion.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_human_message_makes_armed_fallback_stale() {
        let (store, engine, mut fires) = engine(
            only(&[StrategyKind::ChimeInSilence]),
            ScriptedCompletion::constant("Anyone still here?"),
        );
        store.seed(ALICE, "hmm");

        let reports = engine.notify_message(CONVERSATION).await.unwrap();
        assert_eq!(reports[0].fallback, Some(Duration::from_secs(30)));
        let old_origin = reports[0].started_at;

        engine
            .post_human_message(CONVERSATION, ALICE, "still here")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(40)).await;

        let mut handled = 0;
        while let Ok(fire) = fires.try_recv() {
            assert!(fire.origin > old_origin);
            engine.handle_fire(fire).await.unwrap();
            handled += 1;
        }
        assert_eq!(handled, 1);
        assert_eq!(
            store.texts(),
            vec!["hmm", "still here", "Anyone still here?"]
        );
    }
}
