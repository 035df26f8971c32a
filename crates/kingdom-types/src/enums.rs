//! Enumeration types for the kingdom turn engine.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::FactionId;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A quantity tracked in the kingdom's resource map.
///
/// Unrest and fame are stored alongside the material stockpiles so that
/// outcome deltas, modifiers, and ledger entries can address all of them
/// uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Resource {
    /// Coin in the treasury.
    Gold,
    /// Food stores.
    Food,
    /// Cut timber.
    Lumber,
    /// Quarried stone.
    Stone,
    /// Mined ore.
    Ore,
    /// General kingdom unrest (not the imprisoned portion).
    Unrest,
    /// Fame, the scarce currency spent on re-rolls.
    Fame,
}

impl Resource {
    /// Every resource, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Gold,
        Self::Food,
        Self::Lumber,
        Self::Stone,
        Self::Ore,
        Self::Unrest,
        Self::Fame,
    ];

    /// Human-readable name used in preview badges and log lines.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Food => "food",
            Self::Lumber => "lumber",
            Self::Stone => "stone",
            Self::Ore => "ore",
            Self::Unrest => "unrest",
            Self::Fame => "fame",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Settlements
// ---------------------------------------------------------------------------

/// Size tier of a settlement. Ordered `Village < Town < City < Metropolis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SettlementTier {
    /// Tier 1.
    Village,
    /// Tier 2.
    Town,
    /// Tier 3.
    City,
    /// Tier 4.
    Metropolis,
}

impl SettlementTier {
    /// Every tier, smallest first.
    pub const ALL: [Self; 4] = [Self::Village, Self::Town, Self::City, Self::Metropolis];

    /// The tier's ordinal (1 for a village through 4 for a metropolis).
    ///
    /// This is also the unrest generated when the settlement goes unfed.
    pub const fn ordinal(self) -> u32 {
        match self {
            Self::Village => 1,
            Self::Town => 2,
            Self::City => 3,
            Self::Metropolis => 4,
        }
    }

    /// Human-readable tier name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Village => "Village",
            Self::Town => "Town",
            Self::City => "City",
            Self::Metropolis => "Metropolis",
        }
    }
}

// ---------------------------------------------------------------------------
// Turn structure
// ---------------------------------------------------------------------------

/// A fixed stage of a kingdom turn.
///
/// The order is `Status -> Upkeep -> Unrest -> Actions -> Events`, after
/// which the next turn starts again at `Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TurnPhase {
    /// Fame, ongoing modifiers, and income.
    Status,
    /// Feeding, military support, and the build queue.
    Upkeep,
    /// Incident checks driven by the unrest tier.
    Unrest,
    /// Player kingdom actions.
    Actions,
    /// Random kingdom events.
    Events,
}

impl TurnPhase {
    /// Every phase, in turn order.
    pub const ALL: [Self; 5] = [
        Self::Status,
        Self::Upkeep,
        Self::Unrest,
        Self::Actions,
        Self::Events,
    ];

    /// The phase that follows this one. `Events` wraps to `Status`.
    pub const fn next(self) -> Self {
        match self {
            Self::Status => Self::Upkeep,
            Self::Upkeep => Self::Unrest,
            Self::Unrest => Self::Actions,
            Self::Actions => Self::Events,
            Self::Events => Self::Status,
        }
    }

    /// Human-readable phase name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Upkeep => "Upkeep",
            Self::Unrest => "Unrest",
            Self::Actions => "Actions",
            Self::Events => "Events",
        }
    }
}

impl core::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle of the current phase's step list.
///
/// Stored next to the steps so the re-initialization guard is a single
/// comparison: only a `NotStarted` phase may have its steps replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PhaseLifecycle {
    /// No step has been completed yet (or no steps exist).
    #[default]
    NotStarted,
    /// At least one step is complete, at least one is not.
    InProgress,
    /// Every step is complete; the phase may advance.
    Complete,
}

/// The graded result of a check that drives which effect branch applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OutcomeGrade {
    /// Top tier; grants the fame bonus.
    CriticalSuccess,
    /// Ordinary success.
    Success,
    /// Ordinary failure.
    Failure,
    /// Worst result.
    CriticalFailure,
}

impl OutcomeGrade {
    /// Whether the grade counts as a success of either kind.
    pub const fn is_success(self) -> bool {
        matches!(self, Self::CriticalSuccess | Self::Success)
    }

    /// Human-readable grade name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::CriticalSuccess => "critical success",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::CriticalFailure => "critical failure",
        }
    }
}

// ---------------------------------------------------------------------------
// Armies
// ---------------------------------------------------------------------------

/// Broad category of an army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ArmyType {
    /// Foot soldiers.
    Infantry,
    /// Mounted troops.
    Cavalry,
    /// Ranged skirmishers.
    Skirmishers,
    /// Siege engines and crews.
    Siege,
}

/// One of the four equipment slots an army can be outfitted with.
///
/// Each slot may be granted at most once per army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EquipmentSlot {
    /// Armor upgrade.
    Armor,
    /// Weapon upgrade.
    Weapons,
    /// Runic enchantments.
    Runes,
    /// Field gear.
    Gear,
}

impl EquipmentSlot {
    /// Every slot, in display order.
    pub const ALL: [Self; 4] = [Self::Armor, Self::Weapons, Self::Runes, Self::Gear];

    /// Human-readable slot name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Armor => "armor",
            Self::Weapons => "weapons",
            Self::Runes => "runes",
            Self::Gear => "gear",
        }
    }
}

// ---------------------------------------------------------------------------
// Territory
// ---------------------------------------------------------------------------

/// Who controls a hex, leads an army, or owns a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Controller {
    /// The player kingdom.
    Kingdom,
    /// A rival or hostile faction.
    Faction(FactionId),
    /// Nobody.
    #[default]
    Wilderness,
}

impl Controller {
    /// Whether the player kingdom is the controller.
    pub const fn is_kingdom(self) -> bool {
        matches!(self, Self::Kingdom)
    }
}

/// A resource-producing improvement built on a hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Worksite {
    /// Produces food.
    Farmland,
    /// Produces lumber.
    LumberCamp,
    /// Produces stone.
    Quarry,
    /// Produces ore.
    Mine,
}

// ---------------------------------------------------------------------------
// Command parameters
// ---------------------------------------------------------------------------

/// Where imprisoned unrest comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ImprisonMode {
    /// Newly gained unrest goes straight to prison; whatever does not fit
    /// is added to general unrest.
    #[default]
    NewUnrest,
    /// Existing general unrest is moved into prison; whatever does not fit
    /// simply stays as general unrest.
    ExistingUnrest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_order_wraps_after_events() {
        let mut phase = TurnPhase::Status;
        let mut visited = Vec::new();
        for _ in 0..TurnPhase::ALL.len() {
            visited.push(phase);
            phase = phase.next();
        }
        assert_eq!(visited, TurnPhase::ALL.to_vec());
        assert_eq!(phase, TurnPhase::Status);
    }

    #[test]
    fn tiers_are_ordered_by_ordinal() {
        assert!(SettlementTier::Village < SettlementTier::Town);
        assert!(SettlementTier::City < SettlementTier::Metropolis);
        assert_eq!(SettlementTier::City.ordinal(), 3);
    }

    #[test]
    fn resource_serializes_snake_case() {
        let json = serde_json::to_string(&Resource::Unrest).unwrap_or_default();
        assert_eq!(json, "\"unrest\"");
    }

    #[test]
    fn only_successes_count_as_success() {
        assert!(OutcomeGrade::CriticalSuccess.is_success());
        assert!(OutcomeGrade::Success.is_success());
        assert!(!OutcomeGrade::Failure.is_success());
        assert!(!OutcomeGrade::CriticalFailure.is_success());
    }
}
