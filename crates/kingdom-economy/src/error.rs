//! Error types for the kingdom-economy crate.
//!
//! Shortfalls are not errors: feeding, support, and the build queue report
//! unpaid amounts as unrest in their reports. These variants cover invalid
//! requests and integrity failures.

use kingdom_ledger::{LedgerAnomaly, LedgerError};
use kingdom_types::{ProjectId, SettlementId, StructureKey};
use kingdom_world::WorldError;

/// Errors that can occur during economy operations.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// A dice formula did not match the grammar.
    #[error("invalid dice formula {formula:?}: {reason}")]
    InvalidFormula {
        /// The rejected formula.
        formula: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// The settlement does not exist.
    #[error("settlement not found: {0}")]
    SettlementNotFound(SettlementId),

    /// The build project does not exist.
    #[error("build project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// The settlement already has an undamaged copy of the structure.
    #[error("{structure} already stands in settlement {settlement}")]
    StructureAlreadyBuilt {
        /// The structure.
        structure: StructureKey,
        /// The settlement.
        settlement: SettlementId,
    },

    /// The structure is already queued for the settlement.
    #[error("{structure} is already queued for settlement {settlement}")]
    AlreadyQueued {
        /// The structure.
        structure: StructureKey,
        /// The settlement.
        settlement: SettlementId,
    },

    /// A pool operation failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A catalog lookup failed.
    #[error("catalog error: {0}")]
    World(#[from] WorldError),

    /// A pass left the pool out of balance with its ledger.
    #[error("{0}")]
    ConservationViolated(LedgerAnomaly),
}
