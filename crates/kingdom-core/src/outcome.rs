//! Outcome sources: where the grade of an incident or event check comes
//! from.
//!
//! At the table a player rolls and reports the result. The automated
//! runner asks an [`OutcomeSource`] instead: [`RolledOutcome`] rolls a d20
//! against a difficulty, [`FixedOutcome`] always answers with the same
//! grade (useful for tests and scripted campaigns).

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use kingdom_types::{Kingdom, OutcomeGrade, TurnPhase};
use kingdom_world::{Catalog, OutcomeTable};

use crate::steps::{RESOLVE_EVENT, RESOLVE_INCIDENT};

/// Which kind of check is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// An unrest incident.
    Incident,
    /// A random kingdom event.
    Event,
}

impl CheckKind {
    /// Lower-case name for logs and metadata.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Incident => "incident",
            Self::Event => "event",
        }
    }

    /// Phase and step that resolve this kind of check.
    pub const fn resolve_step(self) -> (TurnPhase, &'static str) {
        match self {
            Self::Incident => (TurnPhase::Unrest, RESOLVE_INCIDENT),
            Self::Event => (TurnPhase::Events, RESOLVE_EVENT),
        }
    }

    /// Key of the incident or event awaiting resolution.
    pub fn pending_key(self, kingdom: &Kingdom) -> Option<&str> {
        match self {
            Self::Incident => kingdom.pending_incident.as_deref(),
            Self::Event => kingdom.pending_event.as_deref(),
        }
    }

    /// Forget the pending incident or event.
    pub fn clear_pending(self, kingdom: &mut Kingdom) {
        match self {
            Self::Incident => kingdom.pending_incident = None,
            Self::Event => kingdom.pending_event = None,
        }
    }

    /// Display name and outcome table of catalog entry `key`.
    pub fn lookup(self, catalog: &Catalog, key: &str) -> Option<(String, OutcomeTable)> {
        match self {
            Self::Incident => catalog.incident(key).map(|i| (i.name.clone(), i.outcomes.clone())),
            Self::Event => catalog.event(key).map(|e| (e.name.clone(), e.outcomes.clone())),
        }
    }
}

impl core::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// A source of check grades.
pub trait OutcomeSource: Send {
    /// Grade the check for catalog entry `key`.
    fn grade(&mut self, check: CheckKind, key: &str, rng: &mut dyn RngCore) -> OutcomeGrade;
}

impl<O: OutcomeSource + ?Sized> OutcomeSource for Box<O> {
    fn grade(&mut self, check: CheckKind, key: &str, rng: &mut dyn RngCore) -> OutcomeGrade {
        (**self).grade(check, key, rng)
    }
}

/// Always returns the same grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedOutcome(pub OutcomeGrade);

impl OutcomeSource for FixedOutcome {
    fn grade(&mut self, _check: CheckKind, _key: &str, _rng: &mut dyn RngCore) -> OutcomeGrade {
        self.0
    }
}

/// Rolls `d20 + modifier` against `dc` with the four degrees of success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolledOutcome {
    /// Bonus added to the natural roll.
    pub modifier: i32,
    /// Difficulty class.
    pub dc: i32,
}

impl OutcomeSource for RolledOutcome {
    fn grade(&mut self, check: CheckKind, key: &str, rng: &mut dyn RngCore) -> OutcomeGrade {
        let natural = rng.random_range(1..=20);
        let grade = grade_check(natural, self.modifier, self.dc);
        debug!(check = %check, key, natural, modifier = self.modifier, dc = self.dc, grade = grade.label(), "check rolled");
        grade
    }
}

const fn step_up(grade: OutcomeGrade) -> OutcomeGrade {
    match grade {
        OutcomeGrade::CriticalFailure => OutcomeGrade::Failure,
        OutcomeGrade::Failure => OutcomeGrade::Success,
        OutcomeGrade::Success | OutcomeGrade::CriticalSuccess => OutcomeGrade::CriticalSuccess,
    }
}

const fn step_down(grade: OutcomeGrade) -> OutcomeGrade {
    match grade {
        OutcomeGrade::CriticalSuccess => OutcomeGrade::Success,
        OutcomeGrade::Success => OutcomeGrade::Failure,
        OutcomeGrade::Failure | OutcomeGrade::CriticalFailure => OutcomeGrade::CriticalFailure,
    }
}

/// Grade a check: beating the DC by 10 is a critical success, missing it
/// by 10 a critical failure. A natural 20 improves the result one step and
/// a natural 1 worsens it.
pub fn grade_check(natural: i32, modifier: i32, dc: i32) -> OutcomeGrade {
    let total = natural.saturating_add(modifier);
    let base = if total >= dc.saturating_add(10) {
        OutcomeGrade::CriticalSuccess
    } else if total >= dc {
        OutcomeGrade::Success
    } else if total <= dc.saturating_sub(10) {
        OutcomeGrade::CriticalFailure
    } else {
        OutcomeGrade::Failure
    };
    match natural {
        20 => step_up(base),
        1 => step_down(base),
        _ => base,
    }
}
