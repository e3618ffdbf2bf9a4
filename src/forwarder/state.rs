//! Run state machine.

use serde::{Deserialize, Serialize};

/// Phase of a poll-and-forward run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    WindowComputed,
    Fetching,
    Forwarding,
    Flushing,
    Persisting,
    Done,
    Aborted,
}

impl RunState {
    /// Whether the run has finished, successfully or not.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

/// Tracks the current phase and every phase visited.
#[derive(Debug, Clone)]
pub struct RunStateMachine {
    state: RunState,
    history: Vec<RunState>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Phases visited so far, starting with `Idle`.
    #[must_use]
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn transition(&mut self, new_state: RunState) {
        if self.state == new_state {
            return;
        }
        tracing::debug!(from = ?self.state, to = ?new_state, "Run state transition");
        self.state = new_state;
        self.history.push(new_state);
    }
}
