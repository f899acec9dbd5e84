//! A single conversation strand.

use tracing::warn;

use crate::domain::catalog::State;

/// One conversation strand: current state, the states it came through and
/// at most one pending target waiting on a side-dialogue.
#[derive(Debug, Clone)]
pub struct ConvoThread {
    id: String,
    current: State,
    history: Vec<State>,
    pending: Option<State>,
}

impl ConvoThread {
    pub fn new(id: impl Into<String>, start: State) -> Self {
        Self {
            id: id.into(),
            current: start,
            history: Vec::new(),
            pending: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current(&self) -> &State {
        &self.current
    }

    pub fn history(&self) -> &[State] {
        &self.history
    }

    pub fn pending(&self) -> Option<&State> {
        self.pending.as_ref()
    }

    /// Moves to `state`. History only grows on a real change.
    pub fn update_state(&mut self, state: State) -> bool {
        if state == self.current {
            return false;
        }
        let previous = std::mem::replace(&mut self.current, state);
        self.history.push(previous);
        true
    }

    /// Parks at `hold` and remembers `target` for later.
    ///
    /// The first pending target wins; later calls are ignored until it is
    /// resolved.
    pub fn set_pending(&mut self, hold: State, target: State) -> bool {
        if let Some(existing) = &self.pending {
            warn!(
                thread = %self.id,
                pending = %existing.key,
                ignored = %target.key,
                "Pending state already set"
            );
            return false;
        }
        self.pending = Some(target);
        self.update_state(hold)
    }

    /// Removes and returns the pending target.
    pub fn take_pending(&mut self) -> Option<State> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_records_history_only_on_change() {
        let mut thread = ConvoThread::new("BASE", State::new("S0"));
        assert!(!thread.update_state(State::new("S0")));
        assert!(thread.history().is_empty());

        assert!(thread.update_state(State::new("S1")));
        assert_eq!(thread.current().key, "S1");
        assert_eq!(thread.history()[0].key, "S0");
    }

    #[test]
    fn first_pending_wins() {
        let mut thread = ConvoThread::new("BASE", State::new("S0"));
        assert!(thread.set_pending(State::new("hold"), State::new("S1")));
        assert!(!thread.set_pending(State::new("hold2"), State::new("S2")));
        assert_eq!(thread.pending().unwrap().key, "S1");
        assert_eq!(thread.current().key, "hold");
    }

    #[test]
    fn take_pending_clears_slot() {
        let mut thread = ConvoThread::new("BASE", State::new("S0"));
        thread.set_pending(State::new("hold"), State::new("S1"));
        assert_eq!(thread.take_pending().unwrap().key, "S1");
        assert!(thread.pending().is_none());
    }
}
