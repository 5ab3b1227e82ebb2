//! Per-order state machine as seen by the intake queue.
//!
//! ```text
//! Intake → Building → Committed → Notified
//!                   ↘ Rejected
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

use orderflow_core::{FulfillmentError, OrderId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OrderLifecycle {
    /// Accepted, waiting for the worker.
    Intake,
    /// The worker is building it.
    Building,
    /// Header and items persisted; observers not yet run.
    Committed { order_id: OrderId },
    /// Observers ran. Fan-out outcome does not move it back.
    Notified { order_id: OrderId },
    /// Terminal failure with its typed reason.
    Rejected { reason: FulfillmentError },
}

impl OrderLifecycle {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderLifecycle::Notified { .. } | OrderLifecycle::Rejected { .. })
    }
}

/// Default number of terminal states kept for lookup.
pub const DEFAULT_LIFECYCLE_RETENTION: usize = 10_000;

#[derive(Debug, Default)]
struct Entries {
    states: BTreeMap<u64, OrderLifecycle>,
    /// Terminal sequences, oldest first.
    terminal: VecDeque<u64>,
}

/// Latest lifecycle state for every accepted submission, by intake sequence.
///
/// Non-terminal states are always kept. Once more than `retention` orders
/// have reached a terminal state, the oldest terminal entries are evicted and
/// [`get`](Self::get) returns `None` for them.
#[derive(Debug)]
pub struct LifecycleRegistry {
    entries: RwLock<Entries>,
    retention: usize,
}

impl Default for LifecycleRegistry {
    fn default() -> Self {
        Self::with_retention(DEFAULT_LIFECYCLE_RETENTION)
    }
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            retention,
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn set(&self, sequence: u64, state: OrderLifecycle) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let terminal = state.is_terminal();
        let was_terminal = entries
            .states
            .insert(sequence, state)
            .is_some_and(|prev| prev.is_terminal());

        if terminal && !was_terminal {
            entries.terminal.push_back(sequence);
            while entries.terminal.len() > self.retention {
                if let Some(evicted) = entries.terminal.pop_front() {
                    entries.states.remove(&evicted);
                }
            }
        }
    }

    pub fn remove(&self, sequence: u64) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.states.remove(&sequence).is_some_and(|s| s.is_terminal()) {
            entries.terminal.retain(|seq| *seq != sequence);
        }
    }

    pub fn get(&self, sequence: u64) -> Option<OrderLifecycle> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .states
            .get(&sequence)
            .cloned()
    }

    /// Sequences that have not reached a terminal state yet.
    pub fn outstanding(&self) -> Vec<u64> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .states
            .iter()
            .filter(|(_, s)| !s.is_terminal())
            .map(|(seq, _)| *seq)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .states
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
