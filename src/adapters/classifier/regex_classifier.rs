//! Keyword/regex intent classifier.
//!
//! Stands in for a trained text classifier: each configured label owns a
//! list of patterns and the first label with a matching pattern wins.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::catalog::ClassifierSpec;
use crate::ports::{IntentClassifier, Prediction};

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid"));

#[derive(Debug, Clone)]
struct LabelRule {
    label: String,
    patterns: Vec<Regex>,
}

#[derive(Debug, Clone)]
pub struct RegexIntentClassifier {
    rules: Vec<LabelRule>,
    fallback_label: String,
}

impl RegexIntentClassifier {
    pub fn from_spec(spec: &ClassifierSpec) -> Result<Self, regex::Error> {
        let rules = spec
            .intents
            .iter()
            .map(|rule| {
                let patterns = rule
                    .patterns
                    .iter()
                    .map(|p| Regex::new(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LabelRule {
                    label: rule.label.clone(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            rules,
            fallback_label: spec.fallback_label.clone(),
        })
    }

    fn extract_numbers(text: &str) -> Vec<f64> {
        NUMBER_PATTERN
            .find_iter(text)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .collect()
    }
}

impl IntentClassifier for RegexIntentClassifier {
    fn predict(&self, text: &str) -> Prediction {
        let matched = self
            .rules
            .iter()
            .find(|rule| rule.patterns.iter().any(|p| p.is_match(text)));

        let (label, confidence) = match matched {
            Some(rule) => (rule.label.as_str(), 100),
            None => (self.fallback_label.as_str(), 0),
        };
        debug!(label, confidence, "Regex classifier prediction");

        Prediction::new(label)
            .with_breakdown(format!("<1> Intent:{} Confidence:{}%", label, confidence))
            .with_numbers(Self::extract_numbers(text))
    }
}
