//! Stack of conversation threads with pause/resume semantics.

use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use super::ConvoThread;
use crate::domain::catalog::State;

/// Thread every conversation starts on. It can be paused but never popped.
pub const BASE_THREAD: &str = "BASE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreadError {
    #[error("Thread '{0}' cannot be spawned without a start state")]
    MissingStartState(String),
}

/// Tracks the active conversation strand and the strands paused beneath it.
///
/// The stack holds thread ids; the top is the active thread.
#[derive(Debug, Clone)]
pub struct StateThreader {
    stack: Vec<String>,
    threads: HashMap<String, ConvoThread>,
}

impl StateThreader {
    pub fn new(initial: State) -> Self {
        let mut threads = HashMap::new();
        threads.insert(BASE_THREAD.to_string(), ConvoThread::new(BASE_THREAD, initial));
        Self {
            stack: vec![BASE_THREAD.to_string()],
            threads,
        }
    }

    pub fn current_thread(&self) -> &ConvoThread {
        &self.threads[self.active_id()]
    }

    pub fn current_state(&self) -> &State {
        self.current_thread().current()
    }

    pub fn pending_state(&self) -> Option<&State> {
        self.current_thread().pending()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_state().is_some()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    fn active_id(&self) -> &str {
        self.stack.last().map(String::as_str).unwrap_or(BASE_THREAD)
    }

    fn current_thread_mut(&mut self) -> &mut ConvoThread {
        let id = self.active_id().to_string();
        self.threads
            .entry(id.clone())
            .or_insert_with(|| ConvoThread::new(id, State::new(String::new())))
    }

    /// Pushes a new thread starting at `start`.
    pub fn spawn_thread(&mut self, start: Option<State>, id: &str) -> Result<(), ThreadError> {
        let start = start.ok_or_else(|| ThreadError::MissingStartState(id.to_string()))?;
        self.push_thread(id, start);
        Ok(())
    }

    fn push_thread(&mut self, id: &str, start: State) {
        info!(thread = id, state = %start.key, "Thread spawned");
        self.stack.retain(|t| t != id);
        self.threads.insert(id.to_string(), ConvoThread::new(id, start));
        self.stack.push(id.to_string());
    }

    /// Pops the active thread. The base thread is never popped.
    pub fn kill_current_thread(&mut self) -> bool {
        if self.stack.len() <= 1 || self.active_id() == BASE_THREAD {
            return false;
        }
        if let Some(id) = self.stack.pop() {
            self.threads.remove(&id);
            info!(thread = %id, resumed = self.active_id(), "Thread finished");
        }
        true
    }

    /// Promotes an existing thread to the top of the stack.
    pub fn switch_thread_to(&mut self, id: &str) -> bool {
        if !self.threads.contains_key(id) {
            return false;
        }
        self.stack.retain(|t| t != id);
        self.stack.push(id.to_string());
        debug!(thread = id, "Thread promoted");
        true
    }

    /// Moves the conversation to `target`, switching threads as needed.
    ///
    /// Returns whether the active state actually changed.
    pub fn advance(&mut self, target: State) -> bool {
        let before = self.current_state().clone();

        if before.terminal && target != before {
            self.kill_current_thread();
        }

        if let Some(thread_id) = target.thread_id() {
            if thread_id != self.active_id() {
                if !self.switch_thread_to(thread_id) {
                    let thread_id = thread_id.to_string();
                    self.push_thread(&thread_id, target.clone());
                }
            }
        }

        self.current_thread_mut().update_state(target);
        let changed = *self.current_state() != before;
        if changed {
            info!(
                from = %before.key,
                to = %self.current_state().key,
                thread = self.active_id(),
                "State changed"
            );
        }
        changed
    }

    /// Parks the active thread at `hold` until `target` can be honored.
    pub fn set_pending(&mut self, hold: State, target: State) -> bool {
        self.current_thread_mut().set_pending(hold, target)
    }

    /// Advances to the pending target, if any, and clears it.
    pub fn resolve_pending(&mut self) -> bool {
        match self.current_thread_mut().take_pending() {
            Some(target) => {
                debug!(target = %target.key, "Resolving pending state");
                self.advance(target)
            }
            None => false,
        }
    }

    /// Resolves a pending target in preference to `target`.
    pub fn move_forward(&mut self, target: State) -> bool {
        if self.has_pending() {
            self.resolve_pending()
        } else {
            self.advance(target)
        }
    }
}
