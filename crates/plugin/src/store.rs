//! Replaceable snapshot of per-task scheduling overrides.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::info;

use gthulhu_core::SchedulingStrategy;

type StrategyMap = HashMap<i32, SchedulingStrategy>;

/// Override map keyed by target id. Replacement builds the new map off-lock
/// and swaps the `Arc`, so readers see either the old or the new snapshot.
#[derive(Debug, Default)]
pub struct StrategyStore {
    current: RwLock<Arc<StrategyMap>>,
    /// Snapshot as of the last `changed_since_last_report` call.
    reported: Mutex<Arc<StrategyMap>>,
}

impl StrategyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole snapshot. Later entries win on duplicate ids.
    /// Returns the number of distinct targets now held.
    pub fn replace(&self, strategies: Vec<SchedulingStrategy>) -> usize {
        let next: StrategyMap = strategies.into_iter().map(|s| (s.pid, s)).collect();
        let len = next.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        info!(strategies = len, "updated strategy map");
        len
    }

    pub fn get(&self, id: i32) -> Option<SchedulingStrategy> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .copied()
    }

    pub fn snapshot(&self) -> Arc<StrategyMap> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(added, removed)` relative to the previous call, each sorted by pid.
    /// A modified entry shows up in both: its new value as added, its old
    /// value as removed.
    pub fn changed_since_last_report(&self) -> (Vec<SchedulingStrategy>, Vec<SchedulingStrategy>) {
        let current = self.snapshot();
        let mut reported = self.reported.lock().unwrap_or_else(PoisonError::into_inner);

        let mut added: Vec<_> = current
            .values()
            .filter(|s| reported.get(&s.pid) != Some(*s))
            .copied()
            .collect();
        let mut removed: Vec<_> = reported
            .values()
            .filter(|s| current.get(&s.pid) != Some(*s))
            .copied()
            .collect();
        added.sort_by_key(|s| s.pid);
        removed.sort_by_key(|s| s.pid);

        *reported = current;
        (added, removed)
    }
}
