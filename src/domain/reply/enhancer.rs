//! Message-format rules that build reply fragments into `rep_ext`.

use tracing::debug;

use super::{interpolate, ReplyError};
use crate::domain::catalog::{MsgFormat, Position, DEFAULT_BRANCH};
use crate::domain::foundation::{FactValue, Facts};

/// Facts sub-map holding text fragments for templates, e.g. `{rep_ext[note]}`.
pub const REPLY_EXTENSIONS: &str = "rep_ext";

/// Applies every format rule that targets `state_key` to `facts`.
pub fn enhance_text(
    formats: &[MsgFormat],
    state_key: &str,
    facts: &mut Facts,
    separator: &str,
) -> Result<(), ReplyError> {
    for format in formats.iter().filter(|f| f.states.iter().any(|s| s == state_key)) {
        for fragment in format.if_present.values() {
            add_fragment(facts, format, fragment, separator);
        }

        for (name, branches) in &format.if_value {
            if !format.lookfor.iter().any(|l| l == name) {
                continue;
            }
            let Some(value) = facts.lookup(name).cloned() else {
                continue;
            };
            for item in value.items() {
                let key = item.as_key();
                let fragment = branches
                    .get(&key)
                    .or_else(|| branches.get(DEFAULT_BRANCH))
                    .ok_or_else(|| ReplyError::TemplateResolution {
                        rule: format!("{}.{}", format.writeto, name),
                        value: key.clone(),
                    })?;
                add_fragment(facts, format, fragment, separator);
            }
        }
    }
    Ok(())
}

fn add_fragment(facts: &mut Facts, format: &MsgFormat, fragment: &str, separator: &str) {
    let rendered = interpolate(fragment, facts, separator);
    let extensions = facts.sub_map_mut(REPLY_EXTENSIONS);
    let existing = extensions
        .get(&format.writeto)
        .map(|v| v.render(separator))
        .unwrap_or_default();
    let combined = match format.position {
        Position::Append => existing + &rendered,
        Position::Prepend => rendered + &existing,
    };
    debug!(writeto = %format.writeto, "Reply fragment added");
    extensions.insert(format.writeto.clone(), FactValue::Text(combined));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts;

    fn formats(yaml: &str) -> Vec<MsgFormat> {
        serde_yaml::from_str(yaml).unwrap()
    }

    const RULES: &str = r#"
- states: [S1]
  writeto: note
  if_present:
    a_greeting: "欢迎{city}的朋友。"
- states: [S1]
  writeto: note
  lookfor: [requested_info]
  if_value:
    requested_info:
      city: "请告诉我城市。"
      DEFAULT: "请补充信息。"
- states: [S2]
  writeto: other
  if_present:
    x: "不会出现"
"#;

    fn note(facts: &Facts) -> Option<String> {
        facts.lookup("rep_ext.note").map(|v| v.render(""))
    }

    #[test]
    fn if_present_fragments_are_interpolated() {
        let mut facts = facts!("city" => "上海");
        enhance_text(&formats(RULES), "S1", &mut facts, "、").unwrap();
        assert_eq!(note(&facts).as_deref(), Some("欢迎上海的朋友。"));
        assert!(facts.lookup("rep_ext.other").is_none());
    }

    #[test]
    fn if_value_appends_per_list_item_with_default() {
        let mut facts = facts!(
            "city" => "上海",
            "requested_info" => vec!["city".to_string(), "month".to_string()]
        );
        enhance_text(&formats(RULES), "S1", &mut facts, "、").unwrap();
        assert_eq!(
            note(&facts).as_deref(),
            Some("欢迎上海的朋友。请告诉我城市。请补充信息。")
        );
    }

    #[test]
    fn prepend_puts_fragment_first() {
        let rules = formats(
            "- states: [S1]\n  writeto: note\n  if_present: {a: \"尾\"}\n- states: [S1]\n  writeto: note\n  position: prepend\n  if_present: {b: \"头\"}\n",
        );
        let mut facts = Facts::new();
        enhance_text(&rules, "S1", &mut facts, "、").unwrap();
        assert_eq!(note(&facts).as_deref(), Some("头尾"));
    }

    #[test]
    fn absent_lookfor_fact_is_skipped() {
        let mut facts = Facts::new();
        let rules = formats(
            "- states: [S1]\n  writeto: note\n  lookfor: [level]\n  if_value:\n    level:\n      \"1\": low\n",
        );
        enhance_text(&rules, "S1", &mut facts, "、").unwrap();
        assert!(note(&facts).is_none());
    }

    #[test]
    fn numeric_values_match_integer_keys() {
        let mut facts = facts!("level" => 1.0);
        let rules = formats(
            "- states: [S1]\n  writeto: note\n  lookfor: [level]\n  if_value:\n    level:\n      \"1\": low\n",
        );
        enhance_text(&rules, "S1", &mut facts, "、").unwrap();
        assert_eq!(note(&facts).as_deref(), Some("low"));
    }

    #[test]
    fn value_without_branch_or_default_is_an_error() {
        let mut facts = facts!("level" => 7u32);
        let rules = formats(
            "- states: [S1]\n  writeto: note\n  lookfor: [level]\n  if_value:\n    level:\n      \"1\": low\n",
        );
        let err = enhance_text(&rules, "S1", &mut facts, "、").unwrap_err();
        assert_eq!(
            err,
            ReplyError::TemplateResolution {
                rule: "note.level".into(),
                value: "7".into()
            }
        );
    }
}
