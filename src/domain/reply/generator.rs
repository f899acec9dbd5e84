//! Reply generator: template choice, calculations, enhancement, rendering.

use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{enhance_text, interpolate, Humanizer, ReplyError};
use crate::domain::catalog::{Catalog, Intent, State};
use crate::domain::foundation::{FactValue, Facts};

/// Facts sub-map receiving non-persisted formula results.
pub const CALC_EXTENSIONS: &str = "calc_ext";

/// Final reply text plus facts the store should keep.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReply {
    pub text: String,
    /// Persisted formula results to log back into the fact store.
    pub top_ups: Facts,
}

/// Template set picked for one reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateChoice<'a> {
    pub templates: &'a [String],
    pub humanify: bool,
    pub source: &'a str,
}

pub struct ReplyGenerator {
    catalog: Arc<Catalog>,
    humanizer: Humanizer,
}

impl ReplyGenerator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let humanizer = Humanizer::new(catalog.humanizer().clone());
        Self {
            catalog,
            humanizer,
        }
    }

    /// Picks the template set for a reply.
    ///
    /// A stay prefers the intent's templates, a real change prefers the
    /// state's; either falls back to the other, then to the confused set.
    pub fn select_templates<'a>(
        &'a self,
        state: &'a State,
        intent: Option<&'a Intent>,
        same_state: bool,
    ) -> TemplateChoice<'a> {
        let from_state = TemplateChoice {
            templates: &state.replies,
            humanify: state.humanify,
            source: &state.key,
        };
        let from_intent = intent.map(|i| TemplateChoice {
            templates: &i.replies,
            humanify: i.humanify,
            source: &i.key,
        });

        let order = if same_state {
            [from_intent, Some(from_state)]
        } else {
            [Some(from_state), from_intent]
        };

        order
            .into_iter()
            .flatten()
            .find(|choice| !choice.templates.is_empty())
            .unwrap_or(TemplateChoice {
                templates: self.catalog.confused_replies(),
                humanify: true,
                source: "confused",
            })
    }

    /// Runs the state's formulas and the message-format rules.
    ///
    /// Returns the enhanced facts and the persisted formula results.
    pub fn enhance(&self, state: &State, facts: &Facts) -> Result<(Facts, Facts), ReplyError> {
        let mut enhanced = facts.clone();
        let mut top_ups = Facts::new();

        for name in &state.calcs {
            let Some(formula) = self.catalog.formula(name) else {
                warn!(state = %state.key, formula = %name, "Unknown formula");
                continue;
            };
            let Some(result) = formula.evaluate(&enhanced) else {
                continue;
            };
            if formula.persist_value() {
                enhanced.insert(formula.writeto(), result);
                top_ups.insert(formula.writeto(), result);
            } else {
                enhanced
                    .sub_map_mut(CALC_EXTENSIONS)
                    .insert(formula.writeto().to_string(), FactValue::Number(result));
            }
        }

        enhance_text(
            self.catalog.msg_formats(),
            &state.key,
            &mut enhanced,
            self.humanizer.list_separator(),
        )?;
        Ok((enhanced, top_ups))
    }

    pub fn render<R: Rng + ?Sized>(
        &self,
        state: &State,
        intent: Option<&Intent>,
        same_state: bool,
        facts: &Facts,
        rng: &mut R,
    ) -> Result<RenderedReply, ReplyError> {
        let choice = self.select_templates(state, intent, same_state);
        let (enhanced, top_ups) = self.enhance(state, facts)?;

        let Some(template) = choice.templates.choose(rng) else {
            warn!(state = %state.key, "No reply templates available");
            return Ok(RenderedReply {
                text: String::new(),
                top_ups,
            });
        };

        let mut text = interpolate(template, &enhanced, self.humanizer.list_separator());
        if choice.humanify {
            text = self.humanizer.humanify(&text, &enhanced, rng);
        }
        debug!(source = choice.source, humanified = choice.humanify, "Reply rendered");

        Ok(RenderedReply { text, top_ups })
    }
}

impl std::fmt::Debug for ReplyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyGenerator")
            .field("humanizer", &self.humanizer)
            .finish()
    }
}
