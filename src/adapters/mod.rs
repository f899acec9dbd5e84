//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the dialogue engine to external systems:
//! - `classifier` - Intent classifiers (regex predictor, scripted mock)
//! - `storage` - Fact repositories (YAML files, in-memory)
//! - `transcript` - Transcript stores (JSON files, in-memory)
//! - `clock` - System and fixed clocks

pub mod classifier;
pub mod clock;
pub mod storage;
pub mod transcript;

pub use classifier::{RegexIntentClassifier, ScriptedIntentClassifier};
pub use clock::{FixedClock, SystemClock};
pub use storage::{FileFactRepository, InMemoryFactRepository};
pub use transcript::{FileTranscriptStore, InMemoryTranscriptStore};
