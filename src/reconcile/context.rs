//! Process-wide monitor state and its published snapshot.

use crate::storage::{ConnectorState, StateMap, StorageError, TransitionStore};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::info;

/// Everything the reconciler remembers between ticks. Always rebuildable
/// from the transition log.
#[derive(Debug, Clone)]
pub struct RunContext {
    states: StateMap,
    first_tick: bool,
    consecutive_failures: u32,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::with_states(StateMap::new())
    }
}

impl RunContext {
    pub fn with_states(states: StateMap) -> Self {
        Self {
            states,
            first_tick: true,
            consecutive_failures: 0,
        }
    }

    /// Replay the transition log into a fresh context.
    pub fn restore(store: &dyn TransitionStore) -> Result<Self, StorageError> {
        let states = store.reconstruct_latest()?;
        info!(connectors = states.len(), "Restored connector state from transition log");
        Ok(Self::with_states(states))
    }

    pub fn state(&self, id: &str) -> Option<&ConnectorState> {
        self.states.get(id)
    }

    pub fn states(&self) -> &StateMap {
        &self.states
    }

    pub fn is_first_tick(&self) -> bool {
        self.first_tick
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub(crate) fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }

    /// Returns the count that was cleared.
    pub(crate) fn reset_failures(&mut self) -> u32 {
        std::mem::take(&mut self.consecutive_failures)
    }

    pub(crate) fn commit(&mut self, state: ConnectorState) {
        self.states.insert(state.id.clone(), state);
    }

    pub(crate) fn finish_first_tick(&mut self) {
        self.first_tick = false;
    }

    /// Connector states sorted by id.
    pub fn sorted_states(&self) -> Vec<ConnectorState> {
        let mut states: Vec<ConnectorState> = self.states.values().cloned().collect();
        states.sort_by(|a, b| a.id.cmp(&b.id));
        states
    }

    pub fn snapshot(&self, last_tick: Option<TickOutcome>) -> MonitorSnapshot {
        MonitorSnapshot {
            connectors: self.sorted_states(),
            consecutive_failures: self.consecutive_failures,
            first_tick_pending: self.first_tick,
            last_tick,
        }
    }
}

/// Read-only copy of the monitor state, published after every tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorSnapshot {
    pub connectors: Vec<ConnectorState>,
    pub consecutive_failures: u32,
    pub first_tick_pending: bool,
    pub last_tick: Option<TickOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickOutcome {
    pub at: DateTime<FixedOffset>,
    pub ok: bool,
    pub transitions: usize,
    pub alerts: usize,
    pub error: Option<String>,
}
