//! Everything a handler may read while preparing a command.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use kingdom_types::{Kingdom, OutcomeGrade, PendingState};

/// Input to every handler.
///
/// Targets come only from [`CommandContext::pending`]; handlers never look
/// anywhere else to decide which army, settlement, or faction a command is
/// about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandContext {
    /// Grade of the check that raised the command.
    pub grade: OutcomeGrade,
    /// Snapshot of the kingdom at prepare time.
    pub kingdom: Kingdom,
    /// Explicit targets.
    pub pending: PendingState,
    /// Free-form values carried through to the prepared command.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl CommandContext {
    /// Context for `kingdom` with no targets or metadata.
    pub fn new(grade: OutcomeGrade, kingdom: Kingdom) -> Self {
        Self {
            grade,
            kingdom,
            pending: PendingState::default(),
            metadata: BTreeMap::new(),
        }
    }

    /// Replace the pending targets.
    #[must_use]
    pub fn with_pending(mut self, pending: PendingState) -> Self {
        self.pending = pending;
        self
    }

    /// Attach one metadata value.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
