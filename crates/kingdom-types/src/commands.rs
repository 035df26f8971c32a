//! Command values: the closed set of game effects a check outcome, an
//! incident, or an event can raise.
//!
//! A [`Command`] only carries the parameters the author of the effect knows
//! up front. Targeting that depends on the situation (which army, which
//! settlement, which faction) travels separately in a [`PendingState`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ArmyType, EquipmentSlot, ImprisonMode, Resource};
use crate::ids::{ArmyId, FactionId, SettlementId, StructureKey};
use crate::structs::HexCoord;

/// A quantity that is either fixed or rolled from a dice formula.
///
/// Serialized untagged: `3` or `"-1d4"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum Amount {
    /// A known value.
    Fixed(i32),
    /// A dice formula such as `2d4+1` or `-(1d6)`, rolled on commit.
    Formula(String),
}

impl Amount {
    /// The fixed value, if this amount needs no roll.
    pub const fn fixed(&self) -> Option<i32> {
        match self {
            Self::Fixed(value) => Some(*value),
            Self::Formula(_) => None,
        }
    }
}

impl From<i32> for Amount {
    fn from(value: i32) -> Self {
        Self::Fixed(value)
    }
}

impl From<&str> for Amount {
    fn from(formula: &str) -> Self {
        Self::Formula(formula.to_owned())
    }
}

/// A game effect. One variant per handler; dispatch is an exhaustive match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Command {
    /// Add or remove a resource.
    AdjustResource {
        /// Resource to adjust.
        resource: Resource,
        /// Signed quantity, possibly a dice formula.
        amount: Amount,
    },
    /// Move unrest into settlement prisons.
    ImprisonUnrest {
        /// Requested quantity.
        amount: Amount,
        /// Source of the unrest being imprisoned.
        #[serde(default)]
        mode: ImprisonMode,
    },
    /// Release a percentage of all imprisoned unrest.
    ReleaseImprisoned {
        /// Percentage of the imprisoned total, 0 to 100.
        percent: u32,
        /// Whether released unrest returns to general unrest or vanishes.
        #[serde(default)]
        to_unrest: bool,
    },
    /// Hand the pending settlement to the pending faction.
    TransferSettlement,
    /// Hand the pending army to the pending faction.
    TransferArmy,
    /// The pending faction seizes a contiguous block of kingdom hexes.
    SeizeTerritory {
        /// Number of hexes to seize.
        count: u32,
    },
    /// The player picks hexes to release to the wilderness.
    AbandonHexes {
        /// Number of hexes to abandon.
        count: u32,
    },
    /// Raise a new kingdom-led army.
    RecruitArmy {
        /// Display name.
        name: String,
        /// Army category.
        army_type: ArmyType,
        /// Starting level; defaults to the kingdom level.
        #[serde(default)]
        level: Option<u32>,
    },
    /// Disband the pending army.
    DisbandArmy,
    /// Raise the pending army's level, capped at the kingdom level.
    TrainArmy {
        /// Levels to gain.
        levels: u32,
    },
    /// Grant an equipment slot to an army.
    ///
    /// Without a pending army or a slot, the player is asked to choose.
    OutfitArmy {
        /// Slot to grant, if predetermined.
        #[serde(default)]
        slot: Option<EquipmentSlot>,
    },
    /// Damage random undamaged structures across the kingdom.
    DamageStructure {
        /// Number of structures to damage.
        count: u32,
    },
    /// Remove the pending structure from the pending settlement.
    RemoveStructure,
    /// Grant a structure to the pending settlement (or the capital).
    GrantStructure {
        /// Catalog key of the structure.
        structure: StructureKey,
    },
    /// Attach an ongoing modifier.
    AddModifier {
        /// Display name.
        name: String,
        /// Resource adjusted each Status phase.
        resource: Resource,
        /// Signed amount per turn.
        value: i32,
        /// Number of turns; `None` is permanent.
        #[serde(default)]
        duration: Option<u32>,
    },
}

impl Command {
    /// The serialized `type` tag, used for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AdjustResource { .. } => "adjust_resource",
            Self::ImprisonUnrest { .. } => "imprison_unrest",
            Self::ReleaseImprisoned { .. } => "release_imprisoned",
            Self::TransferSettlement => "transfer_settlement",
            Self::TransferArmy => "transfer_army",
            Self::SeizeTerritory { .. } => "seize_territory",
            Self::AbandonHexes { .. } => "abandon_hexes",
            Self::RecruitArmy { .. } => "recruit_army",
            Self::DisbandArmy => "disband_army",
            Self::TrainArmy { .. } => "train_army",
            Self::OutfitArmy { .. } => "outfit_army",
            Self::DamageStructure { .. } => "damage_structure",
            Self::RemoveStructure => "remove_structure",
            Self::GrantStructure { .. } => "grant_structure",
            Self::AddModifier { .. } => "add_modifier",
        }
    }
}

/// Explicit targeting context for a command.
///
/// Every field is optional; handlers that need a target fail validation
/// when it is missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PendingState {
    /// Army the effect applies to.
    pub army_id: Option<ArmyId>,
    /// Settlement the effect applies to.
    pub settlement_id: Option<SettlementId>,
    /// Faction receiving transferred entities.
    pub faction_id: Option<FactionId>,
    /// Structure the effect applies to.
    pub structure: Option<StructureKey>,
    /// Hex the effect applies to.
    pub hex: Option<HexCoord>,
}

impl PendingState {
    /// Target an army.
    #[must_use]
    pub const fn with_army(mut self, id: ArmyId) -> Self {
        self.army_id = Some(id);
        self
    }

    /// Target a settlement.
    #[must_use]
    pub const fn with_settlement(mut self, id: SettlementId) -> Self {
        self.settlement_id = Some(id);
        self
    }

    /// Name the receiving faction.
    #[must_use]
    pub const fn with_faction(mut self, id: FactionId) -> Self {
        self.faction_id = Some(id);
        self
    }

    /// Target a structure.
    #[must_use]
    pub fn with_structure(mut self, key: StructureKey) -> Self {
        self.structure = Some(key);
        self
    }
}
