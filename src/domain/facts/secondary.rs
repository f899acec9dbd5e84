//! Secondary slots: facts derived from other facts by decision tree.

use std::collections::BTreeMap;

use crate::domain::catalog::{ConfigurationError, SecondarySlotSpec};
use crate::domain::foundation::{FactValue, Facts};

#[derive(Debug, Clone, PartialEq)]
enum DecisionNode {
    Leaf(FactValue),
    Branch(DecisionTree),
}

#[derive(Debug, Clone, PartialEq)]
struct DecisionTree {
    slot: String,
    branches: BTreeMap<String, DecisionNode>,
}

impl DecisionTree {
    fn parse(writeto: &str, root: &BTreeMap<String, FactValue>) -> Result<Self, ConfigurationError> {
        let mut roots = root.iter();
        let (slot, branches) = match (roots.next(), roots.next()) {
            (Some(only), None) => only,
            _ => {
                return Err(ConfigurationError::InvalidSearchTree {
                    writeto: writeto.to_string(),
                    reason: format!("expected exactly one root slot, found {}", root.len()),
                })
            }
        };

        let branches = branches.as_map().ok_or_else(|| ConfigurationError::InvalidSearchTree {
            writeto: writeto.to_string(),
            reason: format!("branches of '{}' must be a mapping", slot),
        })?;

        let branches = branches
            .iter()
            .map(|(value, node)| {
                let node = match node {
                    FactValue::Map(nested) => DecisionNode::Branch(Self::parse(writeto, nested)?),
                    leaf => DecisionNode::Leaf(leaf.clone()),
                };
                Ok((value.clone(), node))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigurationError>>()?;

        Ok(Self {
            slot: slot.clone(),
            branches,
        })
    }

    fn search(&self, facts: &Facts) -> Option<&FactValue> {
        let mut tree = self;
        loop {
            let value = facts.get(&tree.slot)?;
            match tree.branches.get(&value.as_key())? {
                DecisionNode::Leaf(leaf) => return Some(leaf),
                DecisionNode::Branch(next) => tree = next,
            }
        }
    }
}

/// Writes `writeto` from the first matching decision-tree path, or the
/// configured default when no path matches.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondarySlotRule {
    writeto: String,
    tree: DecisionTree,
    default: Option<FactValue>,
}

impl SecondarySlotRule {
    pub fn from_spec(spec: &SecondarySlotSpec) -> Result<Self, ConfigurationError> {
        Ok(Self {
            writeto: spec.writeto.clone(),
            tree: DecisionTree::parse(&spec.writeto, &spec.search_tree)?,
            default: spec.default.clone(),
        })
    }

    pub fn writeto(&self) -> &str {
        &self.writeto
    }

    /// Derived value for the given facts; `None` leaves the fact unset.
    pub fn derive(&self, facts: &Facts) -> Option<FactValue> {
        self.tree
            .search(facts)
            .cloned()
            .or_else(|| self.default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts;

    fn rule(yaml: &str) -> Result<SecondarySlotRule, ConfigurationError> {
        let spec: SecondarySlotSpec = serde_yaml::from_str(yaml).unwrap();
        SecondarySlotRule::from_spec(&spec)
    }

    const SHIFT: &str = r#"
writeto: shift
search_tree:
  city:
    上海:
      state_curr_hour:
        "9": morning
        "21": night
    北京: capital
default: standard
"#;

    #[test]
    fn walks_nested_branches() {
        let rule = rule(SHIFT).unwrap();
        let facts = facts!("city" => "上海", "state_curr_hour" => 21u32);
        assert_eq!(rule.derive(&facts), Some(FactValue::from("night")));
    }

    #[test]
    fn returns_leaf_at_first_level() {
        let rule = rule(SHIFT).unwrap();
        assert_eq!(rule.derive(&facts!("city" => "北京")), Some(FactValue::from("capital")));
    }

    #[test]
    fn falls_back_to_default_when_no_path_matches() {
        let rule = rule(SHIFT).unwrap();
        let facts = facts!("city" => "上海", "state_curr_hour" => 3u32);
        assert_eq!(rule.derive(&facts), Some(FactValue::from("standard")));
    }

    #[test]
    fn leaves_unset_without_default() {
        let rule = rule("writeto: shift\nsearch_tree:\n  city:\n    北京: capital\n").unwrap();
        assert_eq!(rule.derive(&facts!("city" => "深圳")), None);
        assert_eq!(rule.derive(&Facts::new()), None);
    }

    #[test]
    fn rejects_non_mapping_branches() {
        let err = rule("writeto: shift\nsearch_tree:\n  city: oops\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSearchTree { .. }));
    }

    #[test]
    fn rejects_empty_tree() {
        let err = rule("writeto: shift\nsearch_tree: {}\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSearchTree { .. }));
    }
}
