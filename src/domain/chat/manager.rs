//! Turn orchestration for one conversation.

use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, error, info, info_span};

use super::{EngineBlueprint, EngineError};
use crate::domain::catalog::State;
use crate::domain::facts::{FactStore, ZoneTracker};
use crate::domain::foundation::{ConversationId, FactValue, Facts, TurnId};
use crate::domain::gate::Gatekeeper;
use crate::domain::policy::Transition;
use crate::domain::threads::StateThreader;
use crate::ports::{Clock, FactRepository, TranscriptEntry, TranscriptStore};

/// Upper bound on gate-and-override passes in one turn.
pub const MAX_OVERRIDE_ITERATIONS: usize = 5;

/// Fact holding the largest positive number in the utterance.
pub const GIVEN_AMOUNT: &str = "given_amount";

/// Fact listing the slot names the info-request state is waiting for.
pub const REQUESTED_INFO: &str = "requested_info";

/// What one turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub turn_id: TurnId,
    pub reply: String,
    /// Classifier confidence breakdown.
    pub breakdown: String,
    /// Key of the state the conversation is in after the turn.
    pub state: String,
    /// The conversation is parked on a state that only asks for missing info.
    pub awaiting_info: bool,
    /// Fact snapshot after the turn, vault enrichment included.
    pub facts: Facts,
}

/// Drives one conversation, one turn at a time.
///
/// A manager owns its thread stack, gate, fact store and zone cache; only
/// the blueprint is shared. Callers must not run two turns of the same
/// conversation at once.
pub struct ChatManager {
    blueprint: Arc<EngineBlueprint>,
    threader: StateThreader,
    gatekeeper: Gatekeeper,
    store: FactStore,
    zones: ZoneTracker,
    transcript: Arc<dyn TranscriptStore>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
}

impl ChatManager {
    /// Starts a conversation seeded with its persisted facts.
    pub fn start(
        blueprint: Arc<EngineBlueprint>,
        conversation_id: ConversationId,
        repository: Arc<dyn FactRepository>,
        transcript: Arc<dyn TranscriptStore>,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Result<Self, EngineError> {
        let catalog = blueprint.catalog().clone();
        let store =
            FactStore::for_conversation(conversation_id, catalog.clone(), repository, clock.clone())?;

        let mut zones = ZoneTracker::new(catalog.zones().to_vec());
        zones.update_from(&store.snapshot());

        info!(
            conversation_id = %store.conversation_id(),
            initial_state = %catalog.initial_state().key,
            known_facts = store.facts().len(),
            "Conversation started"
        );

        Ok(Self {
            threader: StateThreader::new(catalog.initial_state().clone()),
            gatekeeper: Gatekeeper::new(blueprint.gate_rules().clone()),
            blueprint,
            store,
            zones,
            transcript,
            clock,
            rng,
        })
    }

    pub fn conversation_id(&self) -> &ConversationId {
        self.store.conversation_id()
    }

    pub fn current_state(&self) -> &State {
        self.threader.current_state()
    }

    pub fn pending_state(&self) -> Option<&State> {
        self.threader.pending_state()
    }

    pub fn thread_depth(&self) -> usize {
        self.threader.stack_depth()
    }

    /// Current facts with vault enrichment.
    pub fn facts(&self) -> Facts {
        self.store.snapshot()
    }

    /// Persists the transcript buffered so far.
    pub fn flush_transcript(&self) -> Result<(), EngineError> {
        self.transcript.flush(self.conversation_id())?;
        Ok(())
    }

    /// Runs one request/response cycle for `text`.
    pub fn respond(&mut self, text: &str) -> Result<TurnOutcome, EngineError> {
        let turn_id = TurnId::new();
        let span = info_span!(
            "turn",
            conversation_id = %self.conversation_id(),
            turn_id = %turn_id
        );
        let _entered = span.enter();

        match self.run_turn(turn_id, text) {
            Ok(outcome) => {
                info!(state = %outcome.state, "Turn complete");
                Ok(outcome)
            }
            Err(err) => {
                error!(
                    state = %self.threader.current_state().key,
                    code = %err.code(),
                    error = %err,
                    "Turn failed"
                );
                Err(err)
            }
        }
    }

    fn run_turn(&mut self, turn_id: TurnId, text: &str) -> Result<TurnOutcome, EngineError> {
        let blueprint = self.blueprint.clone();
        let current_key = self.threader.current_state().key.clone();
        let (understanding, prediction) = blueprint.policy().understand(&current_key, text);
        debug!(
            label = %prediction.label,
            intent = ?understanding.intent_key(),
            stay = understanding.transition.is_stay(),
            "Utterance understood"
        );

        let candidate = match understanding.transition.target() {
            Some(target) => target.clone(),
            None => self.threader.current_state().clone(),
        };
        self.gatekeeper.scan(&candidate);

        let mut parsed = blueprint.parser().parse(
            text,
            self.gatekeeper.required_slots(),
            understanding.catalog_intent.as_ref(),
        );
        if let Some(amount) = prediction.given_amount() {
            parsed.insert(GIVEN_AMOUNT, amount);
        }
        self.store.log(parsed, true)?;
        self.zones.update_from(&self.store.snapshot());

        self.settle(candidate)?;

        let state = self.threader.current_state().clone();
        let rendered = blueprint.replies().render(
            &state,
            understanding.intent.as_ref(),
            understanding.transition.is_stay(),
            &self.store.snapshot(),
            &mut self.rng,
        )?;
        if !rendered.top_ups.is_empty() {
            self.store.log(rendered.top_ups, true)?;
        }

        self.transcript.append(
            self.conversation_id(),
            TranscriptEntry {
                turn_id,
                received: text.to_string(),
                sent: rendered.text.clone(),
                at: self.clock.now(),
            },
        )?;

        Ok(TurnOutcome {
            turn_id,
            reply: rendered.text,
            breakdown: prediction.breakdown,
            awaiting_info: state.transition_state,
            state: state.key,
            facts: self.store.snapshot(),
        })
    }

    /// Applies zone overrides and the gate to `candidate`, advancing or
    /// parking the conversation. Repeats while an override keeps
    /// redirecting, up to [`MAX_OVERRIDE_ITERATIONS`].
    fn settle(&mut self, mut candidate: State) -> Result<(), EngineError> {
        let blueprint = self.blueprint.clone();
        for iteration in 0..MAX_OVERRIDE_ITERATIONS {
            let overridden = match blueprint
                .policy()
                .zone_override(&candidate.key, self.zones.zones())
            {
                Some(Transition::Change(target)) if target != candidate => {
                    debug!(iteration, from = %candidate.key, to = %target.key, "Candidate overridden");
                    candidate = target;
                    true
                }
                _ => false,
            };

            self.gatekeeper.scan(&candidate);
            let outcome = self.gatekeeper.try_pass(&self.store.snapshot());
            if !outcome.top_ups.is_empty() {
                self.store.log(outcome.top_ups.clone(), false)?;
            }

            if outcome.passed {
                if self.threader.move_forward(candidate.clone()) {
                    let clear = self.threader.current_state().clear.clone();
                    self.store.clear(&clear)?;
                }
            } else {
                let missing = outcome.unfilled_names();
                debug!(target = %candidate.key, missing = ?missing, "Gate closed, requesting info");
                let mut request = Facts::new();
                request.insert(REQUESTED_INFO, FactValue::from(missing));
                self.store.log(request, true)?;
                let hold = blueprint.policy().info_request_state(&outcome.unfilled);
                self.threader.set_pending(hold, candidate.clone());
            }

            if !overridden {
                break;
            }
            candidate = self.threader.current_state().clone();
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChatManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatManager")
            .field("conversation_id", self.conversation_id())
            .field("state", &self.threader.current_state().key)
            .field("pending", &self.threader.pending_state().map(|s| &s.key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        FixedClock, InMemoryFactRepository, InMemoryTranscriptStore, ScriptedIntentClassifier,
    };
    use crate::domain::catalog::fixtures::{crossroad_yaml, SCENARIO_YAML};
    use crate::domain::catalog::Catalog;
    use crate::facts;
    use crate::ports::{IntentClassifier, Prediction};
    use chrono::NaiveDate;
    use rand::SeedableRng;

    struct Harness {
        manager: ChatManager,
        classifier: ScriptedIntentClassifier,
        repository: InMemoryFactRepository,
        transcript: InMemoryTranscriptStore,
    }

    fn harness_with(yaml: &str, repository: InMemoryFactRepository) -> Harness {
        let classifier = ScriptedIntentClassifier::new("unknown");
        let shared: Arc<dyn IntentClassifier> = Arc::new(classifier.clone());
        let blueprint =
            Arc::new(EngineBlueprint::new(Catalog::from_yaml_str(yaml).unwrap(), shared).unwrap());
        let transcript = InMemoryTranscriptStore::new();
        let clock = FixedClock::new(
            NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
        );
        let manager = ChatManager::start(
            blueprint,
            ConversationId::new("cust-1").unwrap(),
            Arc::new(repository.clone()),
            Arc::new(transcript.clone()),
            Arc::new(clock),
            StdRng::seed_from_u64(1),
        )
        .unwrap();
        Harness {
            manager,
            classifier,
            repository,
            transcript,
        }
    }

    fn harness() -> Harness {
        harness_with(SCENARIO_YAML, InMemoryFactRepository::new())
    }

    mod turns {
        use super::*;

        #[test]
        fn starts_at_initial_state() {
            let h = harness();
            assert_eq!(h.manager.current_state().key, "S0");
            assert_eq!(h.manager.thread_depth(), 1);
        }

        #[test]
        fn stay_rule_replies_from_intent() {
            let mut h = harness();
            h.classifier.push(Prediction::new("greet"));
            let outcome = h.manager.respond("你好").unwrap();
            assert_eq!(outcome.state, "S0");
            assert_eq!(outcome.reply, "您好呀");
        }

        #[test]
        fn unknown_label_stays_and_uses_state_templates() {
            let mut h = harness();
            let outcome = h.manager.respond("啊？").unwrap();
            assert_eq!(outcome.state, "S0");
            assert_eq!(outcome.reply, "您好，请问有什么可以帮您？");
        }

        #[test]
        fn gate_failure_parks_at_info_request_state() {
            let mut h = harness();
            h.classifier.push(Prediction::new("give_city"));
            let outcome = h.manager.respond("我想办理业务").unwrap();
            assert_eq!(outcome.state, "need_info");
            assert!(outcome.awaiting_info);
            assert_eq!(outcome.reply, "请告诉我您的city");
            assert_eq!(h.manager.pending_state().unwrap().key, "S1");
            assert_eq!(
                outcome.facts.get(REQUESTED_INFO),
                Some(&FactValue::from(vec!["city".to_string()]))
            );
        }

        #[test]
        fn entering_state_clears_configured_facts() {
            let mut h = harness();
            h.classifier.push(Prediction::new("give_city"));
            h.manager.respond("我想办理业务").unwrap();
            h.classifier.push(Prediction::new("give_city"));
            let outcome = h.manager.respond("上海").unwrap();
            assert_eq!(outcome.state, "S1");
            assert!(!outcome.awaiting_info);
            assert!(!outcome.facts.contains(REQUESTED_INFO));
        }

        #[test]
        fn given_amount_is_logged() {
            let mut h = harness();
            h.classifier
                .push(Prediction::new("unknown").with_numbers(vec![3.0, 120.0]));
            let outcome = h.manager.respond("120块").unwrap();
            assert_eq!(outcome.facts.get(GIVEN_AMOUNT), Some(&FactValue::Number(120.0)));
        }

        #[test]
        fn known_intent_without_rule_still_logs_its_fills() {
            let yaml = SCENARIO_YAML.replace(
                "  greet:\n    replies: [\"您好呀\"]",
                "  greet:\n    slot_fills:\n      mood: happy\n    replies: [\"您好呀\"]",
            );
            let mut h = harness_with(&yaml, InMemoryFactRepository::new());
            h.classifier.push(Prediction::new("give_city"));
            assert_eq!(h.manager.respond("上海").unwrap().state, "S1");

            h.classifier.push(Prediction::new("greet"));
            let outcome = h.manager.respond("你好").unwrap();
            assert_eq!(outcome.state, "S1");
            assert_eq!(outcome.facts.get("mood"), Some(&FactValue::from("happy")));
        }

        #[test]
        fn server_facts_are_stamped() {
            let mut h = harness();
            let outcome = h.manager.respond("嗯").unwrap();
            assert_eq!(outcome.facts.get("state_curr_hour"), Some(&FactValue::Number(14.0)));
        }
    }

    mod overrides {
        use super::*;

        fn crossroads_yaml(crossroads: &str) -> String {
            let yaml = SCENARIO_YAML.replace(
                "policy:\n  policy_rules:",
                &format!("policy:\n  crossroad_policies:\n{}  policy_rules:", crossroads),
            );
            format!("{}\nfacts:\n  zones: [city]\n", yaml)
        }

        const ON_BEIJING: &str = "      zone: city\n      branches:\n        北京: ";

        #[test]
        fn chained_crossroads_settle_in_one_turn() {
            let yaml = crossroads_yaml(&format!("    S1:\n{0}S2\n    S2:\n{0}S3\n", ON_BEIJING));
            let mut h = harness_with(&yaml, InMemoryFactRepository::new());
            h.classifier.push(Prediction::new("give_city"));

            let outcome = h.manager.respond("北京").unwrap();

            assert_eq!(outcome.state, "S3");
            assert_eq!(outcome.reply, "其他城市专线为您服务");
        }

        #[test]
        fn cyclic_crossroads_stop_after_bounded_redirects() {
            let yaml = crossroads_yaml(&format!("    S1:\n{0}S2\n    S2:\n{0}S1\n", ON_BEIJING));
            let run = || {
                let mut h = harness_with(&yaml, InMemoryFactRepository::new());
                h.classifier.push(Prediction::new("give_city"));
                h.manager.respond("北京").unwrap().state
            };

            // Five redirects starting from S1 end on S2
            assert_eq!(MAX_OVERRIDE_ITERATIONS, 5);
            assert_eq!(run(), "S2");
            assert_eq!(run(), "S2");
        }
    }

    mod collaborators {
        use super::*;

        #[test]
        fn each_turn_is_buffered_in_transcript() {
            let mut h = harness();
            h.classifier.push(Prediction::new("greet"));
            h.manager.respond("你好").unwrap();
            let id = h.manager.conversation_id().clone();
            let pending = h.transcript.pending(&id).unwrap();
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].received, "你好");
            assert_eq!(pending[0].sent, "您好呀");

            h.manager.flush_transcript().unwrap();
            assert!(h.transcript.pending(&id).unwrap().is_empty());
            assert_eq!(h.transcript.flushed(&id).len(), 1);
        }

        #[test]
        fn persisted_facts_seed_the_conversation_and_zones() {
            let id = ConversationId::new("cust-1").unwrap();
            let repository =
                InMemoryFactRepository::new().with_facts(id.clone(), facts!("city" => "北京"));
            let mut h = harness_with(&crossroad_yaml(), repository);
            h.classifier.push(Prediction::new("give_city"));
            let outcome = h.manager.respond("换个业务").unwrap();
            assert_eq!(outcome.state, "S2");
            assert_eq!(outcome.reply, "北京专线为您服务");
            assert!(h.repository.fetch_facts(&id).unwrap().contains("city"));
        }

        #[test]
        fn template_resolution_failure_aborts_turn() {
            let yaml = format!(
                "{}\nreply_formatting:\n  msg_formats:\n    - states: [S1]\n      writeto: note\n      lookfor: [city]\n      if_value:\n        city:\n          北京: 首都\n",
                SCENARIO_YAML
            );
            let mut h = harness_with(&yaml, InMemoryFactRepository::new());
            h.classifier.push(Prediction::new("give_city"));
            let err = h.manager.respond("上海").unwrap_err();
            assert!(matches!(err, EngineError::TemplateResolution { ref value, .. } if value == "上海"));
            assert!(h.transcript.pending(h.manager.conversation_id()).unwrap().is_empty());
        }
    }
}
