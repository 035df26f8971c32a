//! Error types for the kingdom-commands crate.
//!
//! A [`CommandError`] from prepare means the command could not be resolved
//! against the given context (a missing target, an entity the kingdom does
//! not control). A [`CommandError`] from commit means a guard failed inside
//! the store update and nothing was written.

use kingdom_db::StoreError;
use kingdom_economy::EconomyError;
use kingdom_types::{ArmyId, SettlementId, StructureKey};
use kingdom_world::WorldError;

/// Errors that can occur while preparing or committing a command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The command needs a target the pending state does not carry.
    #[error("no {0} selected")]
    MissingTarget(&'static str),

    /// The army does not exist.
    #[error("army not found: {0}")]
    ArmyNotFound(ArmyId),

    /// The settlement does not exist.
    #[error("settlement not found: {0}")]
    SettlementNotFound(SettlementId),

    /// The settlement does not have the structure.
    #[error("{structure} not found in settlement {settlement}")]
    StructureMissing {
        /// The structure.
        structure: StructureKey,
        /// The settlement searched.
        settlement: SettlementId,
    },

    /// The entity is not under the kingdom's control.
    #[error("{0} is not controlled by the kingdom")]
    NotControlled(String),

    /// A selector returned indices outside the offered options.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// A catalog lookup failed.
    #[error("catalog error: {0}")]
    World(#[from] WorldError),

    /// An economy operation failed.
    #[error("economy error: {0}")]
    Economy(#[from] EconomyError),

    /// The store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
