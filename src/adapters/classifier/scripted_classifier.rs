//! Scripted intent classifier for testing.
//!
//! Returns pre-configured predictions in order, falling back to a fixed
//! label once the script runs out, and records every text it was asked
//! to classify.
//!
//! # Example
//!
//! ```ignore
//! let classifier = ScriptedIntentClassifier::new("unknown")
//!     .with_label("give_city")
//!     .with_prediction(Prediction::new("pay").with_numbers(vec![30.0]));
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ports::{IntentClassifier, Prediction};

#[derive(Debug, Clone)]
pub struct ScriptedIntentClassifier {
    /// Pre-configured predictions (consumed in order).
    script: Arc<Mutex<VecDeque<Prediction>>>,
    fallback_label: String,
    /// Texts seen, for verification.
    calls: Arc<Mutex<Vec<String>>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedIntentClassifier {
    pub fn new(fallback_label: impl Into<String>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback_label: fallback_label.into(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a bare label.
    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.with_prediction(Prediction::new(label))
    }

    /// Queue a full prediction.
    pub fn with_prediction(self, prediction: Prediction) -> Self {
        self.push(prediction);
        self
    }

    /// Queue a prediction on a shared handle.
    pub fn push(&self, prediction: Prediction) {
        locked(&self.script).push_back(prediction);
    }

    /// Returns the number of calls made to this classifier.
    pub fn call_count(&self) -> usize {
        locked(&self.calls).len()
    }

    /// Returns all texts seen so far.
    pub fn get_calls(&self) -> Vec<String> {
        locked(&self.calls).clone()
    }
}

impl IntentClassifier for ScriptedIntentClassifier {
    fn predict(&self, text: &str) -> Prediction {
        locked(&self.calls).push(text.to_string());
        locked(&self.script)
            .pop_front()
            .unwrap_or_else(|| Prediction::new(self.fallback_label.clone()))
    }
}
