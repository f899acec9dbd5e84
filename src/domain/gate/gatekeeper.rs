//! The slot-completeness check guarding a state transition.

use std::sync::Arc;
use tracing::debug;

use super::GateRules;
use crate::domain::catalog::{Slot, State};
use crate::domain::foundation::Facts;

/// Result of one [`Gatekeeper::try_pass`] attempt.
///
/// A failed attempt is a normal outcome, not an error: the caller parks the
/// conversation in an info-request state until the slots arrive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GateOutcome {
    pub passed: bool,
    pub unfilled: Vec<Slot>,
    /// Default values that satisfied otherwise unfilled slots.
    pub top_ups: Facts,
}

impl GateOutcome {
    fn open() -> Self {
        Self {
            passed: true,
            ..Self::default()
        }
    }

    /// Names of the still-unfilled slots, in requirement order.
    pub fn unfilled_names(&self) -> Vec<String> {
        self.unfilled.iter().map(|s| s.name.clone()).collect()
    }
}

/// Per-conversation gate. Starts open with nothing required.
#[derive(Debug, Clone)]
pub struct Gatekeeper {
    rules: Arc<GateRules>,
    required: Vec<Slot>,
    open: bool,
}

impl Gatekeeper {
    pub fn new(rules: Arc<GateRules>) -> Self {
        Self {
            rules,
            required: Vec::new(),
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn required_slots(&self) -> &[Slot] {
        &self.required
    }

    /// Adopts the gating slots of `state` and closes the gate.
    ///
    /// Ungated states and gated states without slots leave the gate as is.
    pub fn scan(&mut self, state: &State) {
        let slots = state.gating_slots();
        if slots.is_empty() {
            return;
        }
        debug!(state = %state.key, required = slots.len(), "Gate closed");
        self.required = slots.to_vec();
        self.open = false;
    }

    pub fn try_pass(&mut self, facts: &Facts) -> GateOutcome {
        if self.open {
            return GateOutcome::open();
        }

        let mut required = self.required.clone();
        for slot in self.rules.conditional_slots(facts) {
            if !required.iter().any(|r| r.name == slot.name) {
                required.push(slot);
            }
        }

        let mut top_ups = Facts::new();
        let unfilled: Vec<Slot> = required
            .into_iter()
            .filter(|slot| !facts.contains(&slot.name))
            .filter(|slot| match self.rules.default_for(&slot.name) {
                Some(value) => {
                    top_ups.insert(slot.name.clone(), value.clone());
                    false
                }
                None => true,
            })
            .collect();

        if unfilled.is_empty() {
            self.open = true;
        }
        debug!(
            passed = self.open,
            unfilled = unfilled.len(),
            defaulted = top_ups.len(),
            "Gate checked"
        );

        GateOutcome {
            passed: self.open,
            unfilled,
            top_ups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::FactValue;
    use crate::domain::gate::ConditionalRequirement;
    use crate::facts;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn gated_state() -> State {
        State::new("S1").gated_on(vec![Slot::new("city", "city"), Slot::new("month", "month")])
    }

    fn plain_rules() -> Arc<GateRules> {
        Arc::new(GateRules::default())
    }

    mod scanning {
        use super::*;

        #[test]
        fn new_gate_is_open_and_passes() {
            let mut gate = Gatekeeper::new(plain_rules());
            let outcome = gate.try_pass(&Facts::new());
            assert!(outcome.passed);
            assert!(outcome.unfilled.is_empty());
        }

        #[test]
        fn scan_of_gated_state_closes_gate() {
            let mut gate = Gatekeeper::new(plain_rules());
            gate.scan(&gated_state());
            assert!(!gate.is_open());
            assert_eq!(gate.required_slots().len(), 2);
        }

        #[test]
        fn scan_of_ungated_state_is_noop() {
            let mut gate = Gatekeeper::new(plain_rules());
            gate.scan(&State::new("S0"));
            assert!(gate.is_open());
            assert!(gate.required_slots().is_empty());
        }

        #[test]
        fn scan_of_gated_state_without_slots_is_noop() {
            let mut gate = Gatekeeper::new(plain_rules());
            gate.scan(&State::new("S9").gated_on(vec![]));
            assert!(gate.is_open());
        }
    }

    mod passing {
        use super::*;

        #[test]
        fn fails_with_unfilled_slots_in_order() {
            let mut gate = Gatekeeper::new(plain_rules());
            gate.scan(&gated_state());
            let outcome = gate.try_pass(&facts!("month" => 5u32));
            assert!(!outcome.passed);
            assert_eq!(outcome.unfilled_names(), vec!["city".to_string()]);
            assert!(!gate.is_open());
        }

        #[test]
        fn passes_when_all_slots_present() {
            let mut gate = Gatekeeper::new(plain_rules());
            gate.scan(&gated_state());
            let outcome = gate.try_pass(&facts!("city" => "上海", "month" => 5u32));
            assert!(outcome.passed);
            assert!(gate.is_open());
        }

        #[test]
        fn default_values_fill_slots_and_are_topped_up() {
            let rules = GateRules::new(
                vec![],
                BTreeMap::from([("month".to_string(), FactValue::Number(1.0))]),
            );
            let mut gate = Gatekeeper::new(Arc::new(rules));
            gate.scan(&gated_state());
            let outcome = gate.try_pass(&facts!("city" => "上海"));
            assert!(outcome.passed);
            assert_eq!(outcome.top_ups, facts!("month" => 1u32));
        }

        #[test]
        fn conditional_requirement_is_added() {
            let rules = GateRules::new(
                vec![ConditionalRequirement {
                    if_slot: "city".into(),
                    equals: FactValue::from("上海"),
                    require: vec![Slot::new("district", "district")],
                }],
                BTreeMap::new(),
            );
            let mut gate = Gatekeeper::new(Arc::new(rules));
            gate.scan(&gated_state());
            let outcome = gate.try_pass(&facts!("city" => "上海", "month" => 5u32));
            assert!(!outcome.passed);
            assert_eq!(outcome.unfilled_names(), vec!["district".to_string()]);
        }
    }

    fn slot_names() -> Vec<&'static str> {
        vec!["city", "month", "product", "amount", "name"]
    }

    proptest! {
        #[test]
        fn more_facts_never_close_an_open_result(
            required in proptest::sample::subsequence(slot_names(), 0..=5),
            base in proptest::sample::subsequence(slot_names(), 0..=5),
            extra in proptest::sample::subsequence(slot_names(), 0..=5),
        ) {
            let state = State::new("S").gated_on(
                required.iter().map(|n| Slot::new(*n, *n)).collect(),
            );
            let small: Facts = base.iter().map(|n| (n.to_string(), FactValue::from("x"))).collect();
            let mut large = small.clone();
            for name in &extra {
                large.insert(*name, "y");
            }

            let mut first = Gatekeeper::new(plain_rules());
            first.scan(&state);
            let small_outcome = first.try_pass(&small);

            let mut second = Gatekeeper::new(plain_rules());
            second.scan(&state);
            let large_outcome = second.try_pass(&large);

            prop_assert!(large_outcome.unfilled.len() <= small_outcome.unfilled.len());
            if small_outcome.passed {
                prop_assert!(large_outcome.passed);
            }
        }

        #[test]
        fn defaulted_slot_always_reported_in_top_ups(value in "[a-z]{1,6}") {
            let rules = GateRules::new(
                vec![],
                BTreeMap::from([("month".to_string(), FactValue::from(value.as_str()))]),
            );
            let mut gate = Gatekeeper::new(Arc::new(rules));
            gate.scan(&State::new("S").gated_on(vec![Slot::new("month", "month")]));
            let outcome = gate.try_pass(&Facts::new());
            prop_assert!(outcome.passed);
            prop_assert_eq!(outcome.top_ups.get("month"), Some(&FactValue::from(value.as_str())));
        }
    }
}
