//! The phase/step state machine.
//!
//! The kingdom moves through `Status -> Upkeep -> Unrest -> Actions ->
//! Events` every turn. Each phase carries an ordered step list whose
//! completion flags only ever go from `false` to `true` within the phase.
//! [`PhaseLifecycle`] is kept in step with the flags so the
//! re-initialization guard is a single comparison.
//!
//! These are pure functions on the kingdom aggregate; the turn controller
//! calls them inside the store's transactional update.

use kingdom_types::{Kingdom, PhaseLifecycle, PhaseStep, TurnPhase};
use tracing::{debug, info};

/// Errors from phase and step operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// The operation belongs to a different phase.
    #[error("operation belongs to the {expected} phase, but the kingdom is in {actual}")]
    WrongPhase {
        /// Phase the operation requires.
        expected: TurnPhase,
        /// Phase the kingdom is in.
        actual: TurnPhase,
    },

    /// No step exists at the index.
    #[error("step index {index} out of range (phase has {len} steps)")]
    StepOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of steps in the phase.
        len: usize,
    },

    /// The phase has no step with this name.
    #[error("the {phase} phase has no step named {step:?}")]
    StepMissing {
        /// Step name.
        step: String,
        /// Current phase.
        phase: TurnPhase,
    },

    /// A manual operation ran twice.
    #[error("step {step:?} is already complete")]
    StepAlreadyCompleted {
        /// Step name.
        step: String,
    },

    /// The phase still has incomplete steps.
    #[error("the {phase} phase is not complete")]
    PhaseIncomplete {
        /// Current phase.
        phase: TurnPhase,
    },
}

/// Lifecycle implied by a step list.
fn lifecycle_of(steps: &[PhaseStep]) -> PhaseLifecycle {
    let done = steps.iter().filter(|s| s.completed).count();
    if done == 0 {
        PhaseLifecycle::NotStarted
    } else if done == steps.len() {
        PhaseLifecycle::Complete
    } else {
        PhaseLifecycle::InProgress
    }
}

/// Replace the current phase's step list.
///
/// Ignored (returns `false`) when the kingdom is in a different phase or
/// the phase has already started, so re-entering a phase never discards
/// progress. Steps authored as complete count toward the lifecycle.
pub fn initialize_phase_steps(kingdom: &mut Kingdom, phase: TurnPhase, steps: Vec<PhaseStep>) -> bool {
    if kingdom.current_phase != phase {
        debug!(
            requested = %phase,
            current = %kingdom.current_phase,
            "step initialization ignored: wrong phase"
        );
        return false;
    }
    if kingdom.phase_lifecycle != PhaseLifecycle::NotStarted {
        debug!(phase = %phase, "step initialization ignored: phase already started");
        return false;
    }

    kingdom.phase_lifecycle = lifecycle_of(&steps);
    kingdom.phase_steps = steps;
    debug!(
        phase = %phase,
        steps = kingdom.phase_steps.len(),
        lifecycle = ?kingdom.phase_lifecycle,
        "phase steps initialized"
    );
    true
}

/// Mark step `index` complete. Idempotent.
///
/// Returns whether every step of the phase is now complete.
///
/// # Errors
///
/// Returns [`PhaseError::StepOutOfRange`] if no step exists at `index`.
pub fn complete_phase_step_by_index(kingdom: &mut Kingdom, index: usize) -> Result<bool, PhaseError> {
    let len = kingdom.phase_steps.len();
    let step = kingdom
        .phase_steps
        .get_mut(index)
        .ok_or(PhaseError::StepOutOfRange { index, len })?;
    if !step.completed {
        step.completed = true;
        debug!(phase = %kingdom.current_phase, step = %step.name, "step completed");
    }

    kingdom.phase_lifecycle = lifecycle_of(&kingdom.phase_steps);
    Ok(kingdom.phase_lifecycle == PhaseLifecycle::Complete)
}

/// Whether step `index` is complete. Out-of-range indices read as
/// incomplete.
pub fn is_step_completed_by_index(kingdom: &Kingdom, index: usize) -> bool {
    kingdom.phase_steps.get(index).is_some_and(|s| s.completed)
}

/// Whether the current phase may advance.
pub fn is_phase_complete(kingdom: &Kingdom) -> bool {
    kingdom.phase_lifecycle == PhaseLifecycle::Complete
}

/// Fail unless the kingdom is in `phase`.
///
/// # Errors
///
/// Returns [`PhaseError::WrongPhase`] otherwise.
pub fn require_phase(kingdom: &Kingdom, phase: TurnPhase) -> Result<(), PhaseError> {
    if kingdom.current_phase == phase {
        Ok(())
    } else {
        Err(PhaseError::WrongPhase {
            expected: phase,
            actual: kingdom.current_phase,
        })
    }
}

/// Index of the step named `name` in the current phase.
///
/// # Errors
///
/// Returns [`PhaseError::StepMissing`] if the phase has no such step.
pub fn step_index(kingdom: &Kingdom, name: &str) -> Result<usize, PhaseError> {
    kingdom.step_index(name).ok_or_else(|| PhaseError::StepMissing {
        step: name.to_owned(),
        phase: kingdom.current_phase,
    })
}

/// Move to the next phase. The `Events -> Status` wrap starts a new turn.
///
/// Returns the phase the kingdom is now in.
///
/// # Errors
///
/// Returns [`PhaseError::PhaseIncomplete`] unless every step is complete.
pub fn advance_phase(kingdom: &mut Kingdom) -> Result<TurnPhase, PhaseError> {
    if !is_phase_complete(kingdom) {
        return Err(PhaseError::PhaseIncomplete {
            phase: kingdom.current_phase,
        });
    }

    let next = kingdom.current_phase.next();
    kingdom.current_phase = next;
    kingdom.phase_steps.clear();
    kingdom.phase_lifecycle = PhaseLifecycle::NotStarted;

    if next == TurnPhase::Status {
        kingdom.turn = kingdom.turn.saturating_add(1);
        kingdom.pending_incident = None;
        kingdom.pending_event = None;
        kingdom.resolving = None;
        info!(turn = kingdom.turn, "new turn");
    } else {
        info!(turn = kingdom.turn, phase = %next, "phase advanced");
    }
    Ok(next)
}
