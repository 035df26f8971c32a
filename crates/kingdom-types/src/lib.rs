//! Shared type definitions for the kingdom turn engine.
//!
//! Every other crate in the workspace builds on these types. They derive
//! `serde` for persistence and `ts-rs` so a front end can consume the same
//! shapes.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity identifiers
//! - [`enums`] -- Resources, tiers, phases, outcome grades, controllers
//! - [`structs`] -- The kingdom aggregate and the entities it owns
//! - [`commands`] -- Command values and the explicit targeting context

pub mod commands;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use commands::{Amount, Command, PendingState};
pub use enums::{
    ArmyType, Controller, EquipmentSlot, ImprisonMode, OutcomeGrade, PhaseLifecycle, Resource,
    SettlementTier, TurnPhase, Worksite,
};
pub use ids::{ArmyId, FactionId, KingdomId, ModifierId, ProjectId, SettlementId, StructureKey};
pub use structs::{
    ActiveModifier, Army, BuildProject, BuiltStructure, DEFAULT_EVENT_DC, Equipment,
    Fortification, Hex, HexCoord, Kingdom, LogEntry, PhaseStep, ResolutionMark, ResourceDelta,
    Settlement,
};
