//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the dialogue engine and the outside world. Adapters implement these ports.
//!
//! - `IntentClassifier` - Turns an utterance into an intent label
//! - `FactRepository` - Persists customer facts per conversation
//! - `TranscriptStore` - Records utterance/reply pairs, persisted on flush
//! - `Clock` - Wall-clock source for server-observed facts
//!
//! Every turn runs to completion synchronously, so the ports are plain
//! (non-async) traits.

mod clock;
mod fact_repository;
mod intent_classifier;
mod transcript_store;

pub use clock::Clock;
pub use fact_repository::{FactRepository, RepositoryError};
pub use intent_classifier::{IntentClassifier, Prediction};
pub use transcript_store::{TranscriptEntry, TranscriptError, TranscriptStore};
