//! Turn orchestration for the kingdom turn engine.
//!
//! This crate owns the five-phase turn: Status, Upkeep, Unrest, Actions,
//! and Events. It authors each phase's steps from the kingdom's state,
//! guards step completion, runs the economy passes and the incident and
//! event checks, and routes table outcomes through the command pipeline.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `kingdom-config.yaml` into
//!   strongly-typed structs.
//! - [`phase`] -- The phase/step state machine.
//! - [`steps`] -- Per-phase step lists with pre-computed completion.
//! - [`unrest`] -- Unrest tiers and the incident check.
//! - [`events`] -- The event check and its running difficulty.
//! - [`outcome`] -- [`OutcomeSource`] and the d20 degrees of success.
//! - [`controller`] -- [`TurnController`]: phase operations against a store.
//! - [`runner`] -- Automated turns and campaigns.
//!
//! [`OutcomeSource`]: outcome::OutcomeSource
//! [`TurnController`]: controller::TurnController

pub mod config;
pub mod controller;
pub mod events;
pub mod outcome;
pub mod phase;
pub mod runner;
pub mod steps;
pub mod unrest;

// Re-export primary types at crate root.
pub use config::{ConfigError, KingdomConfig, LogFormat, RulesConfig};
pub use controller::{Resolution, SkippedCommand, StepResult, TurnController, TurnError};
pub use events::EventCheck;
pub use outcome::{CheckKind, FixedOutcome, OutcomeSource, RolledOutcome, grade_check};
pub use phase::{
    PhaseError, advance_phase, complete_phase_step_by_index, initialize_phase_steps,
    is_phase_complete, is_step_completed_by_index,
};
pub use runner::{
    CampaignResult, NoOpCallback, TurnCallback, TurnSummary, pick_targets, run_campaign, run_turn,
};
pub use unrest::IncidentCheck;
