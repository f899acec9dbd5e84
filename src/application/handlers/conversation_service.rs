//! ConversationService - Route customer messages to per-conversation engines

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::domain::chat::{ChatManager, EngineBlueprint, EngineError};
use crate::domain::foundation::{ConversationId, ErrorCode, Facts, TurnId, ValidationError};
use crate::ports::{Clock, FactRepository, TranscriptStore};

/// Command to answer one customer message
#[derive(Debug, Clone)]
pub struct RespondCommand {
    pub conversation_id: String,
    pub message: String,
}

impl RespondCommand {
    pub fn new(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message: message.into(),
        }
    }
}

/// Result of answering a message
#[derive(Debug, Clone)]
pub struct RespondResult {
    pub conversation_id: ConversationId,
    pub turn_id: TurnId,
    pub reply: String,
    pub breakdown: String,
    pub state: String,
    pub awaiting_info: bool,
    pub facts: Facts,
}

/// Error type for conversation commands
#[derive(Debug, Error)]
pub enum RespondError {
    #[error("Invalid conversation id: {0}")]
    InvalidConversationId(#[from] ValidationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Conversation turn was interrupted: {0}")]
    Interrupted(String),
}

impl From<JoinError> for RespondError {
    fn from(err: JoinError) -> Self {
        RespondError::Interrupted(err.to_string())
    }
}

impl RespondError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RespondError::InvalidConversationId(err) => ErrorCode::from(err),
            RespondError::Engine(err) => err.code(),
            RespondError::Interrupted(_) => ErrorCode::InternalError,
        }
    }
}

type SharedManager = Arc<Mutex<ChatManager>>;

/// Owns one [`ChatManager`] per live conversation.
///
/// Turns of the same conversation are serialized by that conversation's
/// mutex; different conversations run independently. Turns do blocking
/// I/O through the ports, so they run on the blocking thread pool.
pub struct ConversationService {
    blueprint: Arc<EngineBlueprint>,
    repository: Arc<dyn FactRepository>,
    transcript: Arc<dyn TranscriptStore>,
    clock: Arc<dyn Clock>,
    rng_seed: Option<u64>,
    conversations: RwLock<HashMap<ConversationId, SharedManager>>,
}

impl ConversationService {
    pub fn new(
        blueprint: Arc<EngineBlueprint>,
        repository: Arc<dyn FactRepository>,
        transcript: Arc<dyn TranscriptStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            blueprint,
            repository,
            transcript,
            clock,
            rng_seed: None,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds every conversation's template choice with `seed`.
    pub fn with_rng_seed(mut self, seed: Option<u64>) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Answers one message, starting the conversation if it is new.
    pub async fn handle(&self, cmd: RespondCommand) -> Result<RespondResult, RespondError> {
        let conversation_id = ConversationId::new(cmd.conversation_id)?;
        let manager = self.manager_for(&conversation_id).await?;

        let message = cmd.message;
        let outcome = tokio::task::spawn_blocking(move || {
            let mut manager = lock_manager(&manager)?;
            let outcome = manager.respond(&message)?;
            Ok::<_, RespondError>(outcome)
        })
        .await??;

        Ok(RespondResult {
            conversation_id,
            turn_id: outcome.turn_id,
            reply: outcome.reply,
            breakdown: outcome.breakdown,
            state: outcome.state,
            awaiting_info: outcome.awaiting_info,
            facts: outcome.facts,
        })
    }

    /// Flushes the transcript and forgets the conversation.
    ///
    /// Returns `false` when the conversation was not live.
    pub async fn end_conversation(&self, conversation_id: &str) -> Result<bool, RespondError> {
        let conversation_id = ConversationId::new(conversation_id)?;
        let removed = self.conversations.write().await.remove(&conversation_id);

        let Some(manager) = removed else {
            return Ok(false);
        };
        tokio::task::spawn_blocking(move || {
            let manager = lock_manager(&manager)?;
            manager.flush_transcript()?;
            Ok::<_, RespondError>(())
        })
        .await??;
        info!(conversation_id = %conversation_id, "Conversation ended");
        Ok(true)
    }

    /// Key of the state a live conversation is in.
    pub async fn current_state(&self, conversation_id: &str) -> Option<String> {
        let conversation_id = ConversationId::new(conversation_id).ok()?;
        let manager = self.conversations.read().await.get(&conversation_id).cloned()?;
        let manager = lock_manager(&manager).ok()?;
        Some(manager.current_state().key.clone())
    }

    pub async fn active_conversations(&self) -> usize {
        self.conversations.read().await.len()
    }

    async fn manager_for(&self, conversation_id: &ConversationId) -> Result<SharedManager, RespondError> {
        if let Some(existing) = self.conversations.read().await.get(conversation_id) {
            return Ok(existing.clone());
        }

        let mut conversations = self.conversations.write().await;
        // Another task may have started it between the two locks
        if let Some(existing) = conversations.get(conversation_id) {
            return Ok(existing.clone());
        }

        let started = tokio::task::spawn_blocking({
            let blueprint = self.blueprint.clone();
            let conversation_id = conversation_id.clone();
            let repository = self.repository.clone();
            let transcript = self.transcript.clone();
            let clock = self.clock.clone();
            let rng = self.rng();
            move || ChatManager::start(blueprint, conversation_id, repository, transcript, clock, rng)
        })
        .await?;
        let manager = started.map_err(|e| {
            warn!(conversation_id = %conversation_id, error = %e, "Failed to start conversation");
            e
        })?;

        let manager = Arc::new(Mutex::new(manager));
        conversations.insert(conversation_id.clone(), manager.clone());
        Ok(manager)
    }

    fn rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// A turn that panicked leaves its manager half-updated; refuse to reuse it.
fn lock_manager(manager: &Mutex<ChatManager>) -> Result<std::sync::MutexGuard<'_, ChatManager>, RespondError> {
    manager
        .lock()
        .map_err(|_| RespondError::Interrupted("conversation lock poisoned".to_string()))
}

impl std::fmt::Debug for ConversationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationService")
            .field("blueprint", &self.blueprint)
            .field("rng_seed", &self.rng_seed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        FixedClock, InMemoryFactRepository, InMemoryTranscriptStore, ScriptedIntentClassifier,
    };
    use crate::domain::catalog::fixtures::scenario_catalog;
    use crate::domain::foundation::FactValue;
    use crate::facts;
    use crate::ports::Prediction;
    use chrono::NaiveDate;

    struct Setup {
        service: ConversationService,
        classifier: ScriptedIntentClassifier,
        repository: InMemoryFactRepository,
        transcript: InMemoryTranscriptStore,
    }

    fn setup_with(repository: InMemoryFactRepository) -> Setup {
        let classifier = ScriptedIntentClassifier::new("unknown");
        let blueprint =
            EngineBlueprint::new(scenario_catalog(), Arc::new(classifier.clone())).unwrap();
        let transcript = InMemoryTranscriptStore::new();
        let clock = FixedClock::new(
            NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
        );
        let service = ConversationService::new(
            Arc::new(blueprint),
            Arc::new(repository.clone()),
            Arc::new(transcript.clone()),
            Arc::new(clock),
        )
        .with_rng_seed(Some(7));

        Setup {
            service,
            classifier,
            repository,
            transcript,
        }
    }

    fn setup() -> Setup {
        setup_with(InMemoryFactRepository::new())
    }

    fn id(raw: &str) -> ConversationId {
        ConversationId::new(raw).unwrap()
    }

    mod handling {
        use super::*;

        #[tokio::test]
        async fn first_message_starts_conversation() {
            let s = setup();
            s.classifier.push(Prediction::new("greet"));

            let result = s.service.handle(RespondCommand::new("alice", "你好")).await.unwrap();

            assert_eq!(result.conversation_id, id("alice"));
            assert_eq!(result.reply, "您好呀");
            assert_eq!(result.state, "S0");
            assert_eq!(s.service.active_conversations().await, 1);
        }

        #[tokio::test]
        async fn conversations_keep_separate_state() {
            let s = setup();
            s.classifier.push(Prediction::new("give_city"));
            s.classifier.push(Prediction::new("greet"));

            let alice = s.service.handle(RespondCommand::new("alice", "上海")).await.unwrap();
            let bob = s.service.handle(RespondCommand::new("bob", "你好")).await.unwrap();

            assert_eq!(alice.state, "S1");
            assert_eq!(bob.state, "S0");
            assert_eq!(s.service.current_state("alice").await.as_deref(), Some("S1"));
            assert_eq!(s.service.current_state("bob").await.as_deref(), Some("S0"));
            assert_eq!(s.service.active_conversations().await, 2);
        }

        #[tokio::test]
        async fn new_conversation_is_seeded_from_persisted_facts() {
            let repository =
                InMemoryFactRepository::new().with_facts(id("carol"), facts!("city" => "深圳"));
            let s = setup_with(repository);
            s.classifier.push(Prediction::new("give_city"));

            let result = s.service.handle(RespondCommand::new("carol", "嗯")).await.unwrap();

            assert_eq!(result.state, "S1");
            assert_eq!(result.facts.get("city"), Some(&FactValue::from("深圳")));
        }

        #[tokio::test]
        async fn blank_conversation_id_is_rejected() {
            let s = setup();
            let err = s.service.handle(RespondCommand::new("  ", "你好")).await.unwrap_err();

            assert!(matches!(err, RespondError::InvalidConversationId(_)));
            assert_eq!(err.code(), ErrorCode::EmptyField);
            assert_eq!(s.service.active_conversations().await, 0);
        }

        #[tokio::test]
        async fn turns_persist_facts_through_repository() {
            let s = setup();
            s.classifier.push(Prediction::new("give_city"));

            s.service.handle(RespondCommand::new("alice", "北京")).await.unwrap();

            let persisted = s.repository.fetch_facts(&id("alice")).unwrap();
            assert_eq!(persisted.get("city"), Some(&FactValue::from("北京")));
        }
    }

    mod blocking {
        use super::*;
        use crate::ports::RepositoryError;
        use std::sync::mpsc::{self, Receiver};
        use std::time::Duration;

        /// Holds the first write until the test releases it.
        struct HeldRepository {
            inner: InMemoryFactRepository,
            release: Mutex<Option<Receiver<()>>>,
        }

        impl FactRepository for HeldRepository {
            fn fetch_facts(&self, conversation_id: &ConversationId) -> Result<Facts, RepositoryError> {
                self.inner.fetch_facts(conversation_id)
            }

            fn write_facts(
                &self,
                conversation_id: &ConversationId,
                facts: &Facts,
            ) -> Result<(), RepositoryError> {
                let held = self.release.lock().unwrap().take();
                if let Some(release) = held {
                    release
                        .recv_timeout(Duration::from_secs(5))
                        .map_err(|_| RepositoryError::IoError("never released".to_string()))?;
                }
                self.inner.write_facts(conversation_id, facts)
            }
        }

        #[tokio::test(flavor = "current_thread")]
        async fn slow_storage_does_not_stall_the_runtime() {
            let classifier = ScriptedIntentClassifier::new("unknown");
            classifier.push(Prediction::new("give_city"));
            let blueprint =
                EngineBlueprint::new(scenario_catalog(), Arc::new(classifier.clone())).unwrap();
            let (release, held) = mpsc::channel();
            let repository = HeldRepository {
                inner: InMemoryFactRepository::new(),
                release: Mutex::new(Some(held)),
            };
            let service = ConversationService::new(
                Arc::new(blueprint),
                Arc::new(repository),
                Arc::new(InMemoryTranscriptStore::new()),
                Arc::new(FixedClock::new(
                    NaiveDate::from_ymd_opt(2024, 5, 17)
                        .unwrap()
                        .and_hms_opt(14, 0, 0)
                        .unwrap(),
                )),
            )
            .with_rng_seed(Some(7));

            // The only runtime thread must stay free to run the releasing task
            let turn = service.handle(RespondCommand::new("alice", "上海"));
            let releaser = async {
                tokio::task::yield_now().await;
                release.send(()).unwrap();
            };
            let (result, ()) = tokio::join!(turn, releaser);

            assert_eq!(result.unwrap().state, "S1");
        }

        #[test]
        fn interrupted_turn_reports_internal_error() {
            let err = RespondError::Interrupted("conversation lock poisoned".to_string());
            assert_eq!(err.code(), ErrorCode::InternalError);
        }
    }

    mod lifecycle {
        use super::*;

        #[tokio::test]
        async fn end_conversation_flushes_and_forgets() {
            let s = setup();
            s.classifier.push(Prediction::new("greet"));
            s.service.handle(RespondCommand::new("alice", "你好")).await.unwrap();
            assert!(s.transcript.flushed(&id("alice")).is_empty());

            assert!(s.service.end_conversation("alice").await.unwrap());

            let flushed = s.transcript.flushed(&id("alice"));
            assert_eq!(flushed.len(), 1);
            assert_eq!(flushed[0].received, "你好");
            assert_eq!(flushed[0].sent, "您好呀");
            assert_eq!(s.service.active_conversations().await, 0);
            assert!(s.service.current_state("alice").await.is_none());
        }

        #[tokio::test]
        async fn ending_unknown_conversation_returns_false() {
            let s = setup();
            assert!(!s.service.end_conversation("nobody").await.unwrap());
        }

        #[tokio::test]
        async fn restarted_conversation_begins_at_initial_state() {
            let s = setup();
            s.classifier.push(Prediction::new("give_city"));
            s.service.handle(RespondCommand::new("alice", "上海")).await.unwrap();
            s.service.end_conversation("alice").await.unwrap();

            s.classifier.push(Prediction::new("greet"));
            let result = s.service.handle(RespondCommand::new("alice", "你好")).await.unwrap();

            assert_eq!(result.state, "S0");
            assert_eq!(result.facts.get("city"), Some(&FactValue::from("上海")));
        }
    }
}
