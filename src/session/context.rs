//! Accumulated job context and plan canonicalization

use serde_json::{Map, Value};

use crate::planner::Action;

/// Job-field data accumulated over one link's planning rounds.
///
/// Each round's `job_summary` is merged in with last-write-wins semantics and
/// the whole map is echoed back to the planner so it can skip re-deriving
/// fields it already produced. Reset to empty at the start of every link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobContext(Map<String, Value>);

impl JobContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge incoming fields: every key present in `incoming` overwrites the
    /// existing value; absent keys are left untouched. No quality comparison
    /// is attempted locally — the planner is instructed to prefer improving
    /// values and is trusted on it.
    pub fn merge(&mut self, incoming: &Map<String, Value>) {
        for (key, value) in incoming {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Immutable copy for outcome recording.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.0.clone()
    }
}

/// Canonical serialization of an action list, used only for equality
/// comparison between rounds — never parsed back.
///
/// Field order is fixed by the `Action` struct definition, so serde_json
/// output is deterministic.
pub fn fingerprint(actions: &[Action]) -> String {
    serde_json::to_string(actions).unwrap_or_default()
}
