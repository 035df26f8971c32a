//! Dice, outcome application, and upkeep allocation for the kingdom turn
//! engine.
//!
//! Every pass that moves resources opens a
//! [`ResourcePool`](kingdom_ledger::ResourcePool) on the kingdom, spends or
//! collects through it, and closes it with [`pass::close_pool`], which
//! checks conservation before writing the net change back. Shortfalls are
//! never errors; they show up as unrest in the pass's report.
//!
//! # Modules
//!
//! - [`config`] -- [`EconomyRules`] and the feeding policy.
//! - [`dice`] -- `NdM+K` formula parsing and evaluation.
//! - [`error`] -- Error types for economy operations.
//! - [`outcome`] -- Applying resolved deltas with flooring and the fame cap.
//! - [`feeding`] -- Settlement feeding in priority order.
//! - [`military`] -- Army support and fortification maintenance.
//! - [`build_queue`] -- Queueing, partial payment, completion, cancellation.
//! - [`income`] -- Settlement gold and worksite yields.
//! - [`modifiers`] -- Ongoing per-turn modifiers.
//! - [`pass`] -- Closing a pool against the kingdom.

pub mod build_queue;
pub mod config;
pub mod dice;
pub mod error;
pub mod feeding;
pub mod income;
pub mod military;
pub mod modifiers;
pub mod outcome;
pub mod pass;

// Re-export primary types at crate root.
pub use build_queue::{
    BuildReport, CompletedProject, ProjectPayment, cancel_project, grant_structure, pay_projects,
    process_build_queue, queue_project,
};
pub use config::{EconomyRules, FeedingPolicy};
pub use dice::{DiceFormula, evaluate, resolve_amount};
pub use error::EconomyError;
pub use feeding::{FeedingReport, allocate_food, feed_settlements, feeding_order};
pub use income::{IncomeReport, collect_income};
pub use military::{DisbandedArmy, MilitaryReport, allocate_support, needs_support, support_military};
pub use modifiers::{ModifierReport, apply_modifiers};
pub use outcome::{OutcomeReport, apply_delta, apply_outcome, grant_fame};
pub use pass::close_pool;
