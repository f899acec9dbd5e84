//! Intent classifier adapters
//!
//! - **RegexIntentClassifier** - keyword/regex predictor configured from the resource document
//! - **ScriptedIntentClassifier** - queued predictions for tests and demos

mod regex_classifier;
mod scripted_classifier;

pub use regex_classifier::RegexIntentClassifier;
pub use scripted_classifier::ScriptedIntentClassifier;
