//! Turn resource pool and payment ledger for the kingdom turn engine.
//!
//! Upkeep and income never touch the kingdom's resource map directly. They
//! draw from and pay into a [`ResourcePool`] snapshot, which records every
//! movement in an append-only [`Ledger`]. When the pass is over the pool
//! writes its net change back to the kingdom in one step.
//!
//! # Modules
//!
//! - [`entry`] -- [`LedgerEntry`] values and their categories.
//! - [`ledger`] -- The [`Ledger`] struct: append-only log with recording methods.
//! - [`pool`] -- The [`ResourcePool`] that allocation passes withdraw from.
//! - [`conservation`] -- Conservation verification and anomaly detection.
//!
//! # Conservation Law
//!
//! For every turn T and every resource R touched by a pool:
//!
//! ```text
//! opening(R) + credits(R in T) - debits(R in T) == closing(R)
//! debits(R in T) <= opening(R) + credits(R in T)
//! ```
//!
//! The second line is the allocation bound: no pass can spend more than
//! was on hand. A violation produces a [`LedgerAnomaly`]. The ledger never
//! panics; it returns errors.
//!
//! | Entry type | Direction | Source |
//! |------------|-----------|--------|
//! | `Income` | credit | settlement and worksite yields |
//! | `ModifierDelta` | either | ongoing modifiers |
//! | `SettlementFood` | debit | feeding |
//! | `ArmyFood` / `ArmyGold` | debit | military support |
//! | `FortificationMaintenance` | debit | military support |
//! | `BuildInvestment` | debit | build queue |
//! | `BuildRefund` | credit | build cancellation |
//!
//! # Usage
//!
//! ```
//! use std::collections::BTreeMap;
//! use kingdom_ledger::{LedgerEntryType, ResourcePool};
//! use kingdom_ledger::conservation::ConservationResult;
//! use kingdom_types::Resource;
//!
//! let mut opening = BTreeMap::new();
//! opening.insert(Resource::Food, 5);
//! let mut pool = ResourcePool::new(1, &opening);
//!
//! let paid = pool.withdraw_up_to(Resource::Food, 3, LedgerEntryType::SettlementFood, "Town")?;
//! assert_eq!(paid, 3);
//! assert_eq!(pool.available(Resource::Food), 2);
//! assert_eq!(pool.verify_conservation(), ConservationResult::Balanced);
//! # Ok::<(), kingdom_ledger::LedgerError>(())
//! ```

pub mod conservation;
pub mod entry;
pub mod ledger;
pub mod pool;

// Re-export primary types at crate root.
pub use conservation::ConservationResult;
pub use entry::{Direction, LedgerEntry, LedgerEntryType};
pub use ledger::{EntryParams, Ledger};
pub use pool::ResourcePool;

use std::collections::BTreeMap;

use kingdom_types::Resource;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when moving resources through a pool.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Quantity must be strictly positive.
    #[error("ledger entry quantity must be non-zero")]
    ZeroQuantity,

    /// An all-or-nothing withdrawal could not be covered.
    #[error("insufficient {resource}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// The resource requested.
        resource: Resource,
        /// The amount requested.
        requested: u32,
        /// The amount on hand.
        available: u32,
    },

    /// A running total overflowed.
    #[error("arithmetic overflow while tracking {resource}")]
    Overflow {
        /// The resource whose total overflowed.
        resource: Resource,
    },
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A conservation violation detected at the end of an allocation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnomaly {
    /// The turn where the anomaly was detected.
    pub turn: u32,
    /// Per-resource imbalance: (expected closing, actual closing).
    pub imbalances: BTreeMap<Resource, (i64, i64)>,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
