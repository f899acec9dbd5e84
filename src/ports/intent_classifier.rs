//! Intent Classifier Port - Interface for the utterance classifier.
//!
//! The keyword/regex predictor and a trained model are interchangeable
//! implementations of this contract.

/// Result of classifying one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Intent label; always present, a fallback label on low confidence.
    pub label: String,
    /// Human-readable confidence breakdown.
    pub breakdown: String,
    /// Numeric literals found in the text.
    pub numbers: Vec<f64>,
}

impl Prediction {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            breakdown: String::new(),
            numbers: Vec::new(),
        }
    }

    pub fn with_numbers(mut self, numbers: Vec<f64>) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn with_breakdown(mut self, breakdown: impl Into<String>) -> Self {
        self.breakdown = breakdown.into();
        self
    }

    /// Largest extracted number, when it is positive.
    pub fn given_amount(&self) -> Option<f64> {
        self.numbers
            .iter()
            .copied()
            .fold(None, |max: Option<f64>, n| match max {
                Some(m) if m >= n => Some(m),
                _ => Some(n),
            })
            .filter(|n| *n > 0.0)
    }
}

/// Port for turning text into an intent label
pub trait IntentClassifier: Send + Sync {
    /// Classify well-formed text; must never fail
    fn predict(&self, text: &str) -> Prediction;
}
