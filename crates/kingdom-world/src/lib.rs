//! Static rule tables, territory, and starting state for the kingdom turn
//! engine.
//!
//! # Modules
//!
//! - [`catalog`] -- Read-only tables: structures, fortifications, settlement
//!   tiers, income, worksites, incidents, and events.
//! - [`error`] -- Error types for catalog loading and lookups.
//! - [`prisons`] -- Imprisonment capacity derived from built structures.
//! - [`territory`] -- Controlled-hex queries and contiguous random seizure.
//! - [`starting_kingdom`] -- Default kingdom for a new campaign.

pub mod catalog;
pub mod error;
pub mod prisons;
pub mod starting_kingdom;
pub mod territory;

// Re-export primary types at crate root.
pub use catalog::{
    Catalog, EventTemplate, FortificationTier, IncidentTemplate, IncomeBand, OutcomeEffect,
    OutcomeTable, SettlementTierRules, StructureBlueprint, WorksiteYield,
};
pub use error::WorldError;
pub use prisons::{
    PrisonAllocation, allocate_imprisonment, imprisonment_capacity, remaining_capacity,
    total_allocated,
};
pub use starting_kingdom::create_starting_kingdom;
pub use territory::{controlled_hexes, seizable_hexes, select_contiguous};
