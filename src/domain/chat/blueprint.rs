//! Shared, read-only engine parts built once per catalog.

use std::sync::Arc;

use crate::domain::catalog::{Catalog, ConfigurationError};
use crate::domain::gate::GateRules;
use crate::domain::parsing::InfoParser;
use crate::domain::policy::PolicyKeeper;
use crate::domain::reply::ReplyGenerator;
use crate::ports::IntentClassifier;

/// Everything conversations share: catalog, policies, parser, gate rules
/// and reply generator. Conversations hold it behind an `Arc`.
#[derive(Debug)]
pub struct EngineBlueprint {
    catalog: Arc<Catalog>,
    policy: PolicyKeeper,
    parser: InfoParser,
    gate_rules: Arc<GateRules>,
    replies: ReplyGenerator,
}

impl EngineBlueprint {
    pub fn new(
        catalog: Catalog,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Result<Self, ConfigurationError> {
        let catalog = Arc::new(catalog);
        let policy = PolicyKeeper::new(catalog.clone(), classifier)?;
        let parser = InfoParser::from_spec(catalog.info_parser())?;
        let gate_rules = Arc::new(GateRules::from_spec(catalog.gating()));
        let replies = ReplyGenerator::new(catalog.clone());
        Ok(Self {
            catalog,
            policy,
            parser,
            gate_rules,
            replies,
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn policy(&self) -> &PolicyKeeper {
        &self.policy
    }

    pub fn parser(&self) -> &InfoParser {
        &self.parser
    }

    pub fn gate_rules(&self) -> &Arc<GateRules> {
        &self.gate_rules
    }

    pub fn replies(&self) -> &ReplyGenerator {
        &self.replies
    }
}
