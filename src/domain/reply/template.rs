//! Placeholder interpolation for reply templates.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;

use crate::domain::foundation::Facts;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"));

/// Replaces every `{path}` in `template` with the fact at `path`.
///
/// Paths may be nested (`{calc_ext.total}` or `{rep_ext[note]}`). Lists
/// render joined by `separator`; placeholders without a fact render empty.
pub fn interpolate(template: &str, facts: &Facts, separator: &str) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let path = caps[1].trim();
            match facts.lookup(path) {
                Some(value) => value.render(separator),
                None => {
                    warn!(placeholder = path, "Template placeholder has no fact");
                    String::new()
                }
            }
        })
        .into_owned()
}
