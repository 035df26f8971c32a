//! Resolved effects and the pure functions that apply them.
//!
//! An [`Effect`] is plain data: every target has been chosen and every
//! quantity known at prepare time is fixed. [`Effect::apply`] runs inside
//! the store's update and re-checks each guard against the state it is
//! about to change, so a stale preview cannot corrupt the kingdom.

use serde::{Deserialize, Serialize};
use tracing::debug;

use kingdom_economy::{apply_delta, evaluate, grant_structure};
use kingdom_types::{
    ActiveModifier, Amount, Army, ArmyId, Controller, EquipmentSlot, FactionId, HexCoord,
    ImprisonMode, Kingdom, Resource, Settlement, SettlementId, StructureKey,
};
use kingdom_world::{Catalog, PrisonAllocation, imprisonment_capacity, remaining_capacity};

use crate::error::CommandError;

/// Unrest withdrawn from one settlement's prison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// The settlement.
    pub settlement_id: SettlementId,
    /// Unrest released.
    pub amount: u32,
}

/// A structure in a specific settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureTarget {
    /// The settlement.
    pub settlement_id: SettlementId,
    /// The structure.
    pub structure: StructureKey,
}

/// A fully targeted game effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Nothing happens.
    Nothing {
        /// Why.
        reason: String,
    },
    /// Change a resource. Formulas are rolled at commit.
    AdjustResource {
        /// Resource to change.
        resource: Resource,
        /// Signed quantity.
        amount: Amount,
    },
    /// Put unrest in one or more settlements' prisons.
    Imprison {
        /// Planned share per settlement, roomiest first. Empty when no
        /// prison has room.
        allocations: Vec<PrisonAllocation>,
        /// Unrest to imprison before clamping to capacity.
        amount: u32,
        /// Where the unrest comes from.
        mode: ImprisonMode,
    },
    /// Empty prisons.
    Release {
        /// Per-settlement withdrawals.
        withdrawals: Vec<Withdrawal>,
        /// Whether released unrest returns to the kingdom's unrest.
        to_unrest: bool,
    },
    /// Hand a settlement to a faction.
    TransferSettlement {
        /// The settlement.
        settlement_id: SettlementId,
        /// The new owner.
        faction_id: FactionId,
    },
    /// Hand an army to a faction.
    TransferArmy {
        /// The army.
        army_id: ArmyId,
        /// The new leader.
        faction_id: FactionId,
    },
    /// A faction takes hexes.
    SeizeHexes {
        /// Hexes taken.
        hexes: Vec<HexCoord>,
        /// The new controller.
        faction_id: FactionId,
    },
    /// Hexes return to the wilderness.
    AbandonHexes {
        /// Hexes released.
        hexes: Vec<HexCoord>,
    },
    /// Add an army.
    RecruitArmy {
        /// The new army.
        army: Army,
    },
    /// Remove an army.
    DisbandArmy {
        /// The army.
        army_id: ArmyId,
    },
    /// Set an army's level.
    TrainArmy {
        /// The army.
        army_id: ArmyId,
        /// New level.
        level: u32,
    },
    /// Grant an equipment slot.
    OutfitArmy {
        /// The army.
        army_id: ArmyId,
        /// The slot.
        slot: EquipmentSlot,
    },
    /// Mark structures damaged.
    DamageStructures {
        /// Structures hit.
        targets: Vec<StructureTarget>,
    },
    /// Remove a structure.
    RemoveStructure {
        /// The structure.
        target: StructureTarget,
    },
    /// Add (or repair) a structure.
    GrantStructure {
        /// The structure.
        target: StructureTarget,
    },
    /// Attach an ongoing modifier.
    AddModifier {
        /// The modifier.
        modifier: ActiveModifier,
    },
}

impl Effect {
    /// Roll any deferred dice, fixing the result in place.
    pub fn roll(&mut self, rng: &mut impl rand::Rng) -> Option<i32> {
        let Self::AdjustResource { amount, .. } = self else {
            return None;
        };
        let Amount::Formula(formula) = amount else {
            return None;
        };
        let rolled = evaluate(formula, rng);
        *amount = Amount::Fixed(rolled);
        Some(rolled)
    }

    /// Apply to `kingdom`. Returns the log message, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when a target has vanished or changed hands
    /// since prepare. The caller discards the mutated copy.
    pub fn apply(
        self,
        kingdom: &mut Kingdom,
        catalog: &Catalog,
    ) -> Result<Option<String>, CommandError> {
        match self {
            Self::Nothing { reason } => {
                debug!(reason = %reason, "no-op effect committed");
                Ok(None)
            }
            Self::AdjustResource { resource, amount } => {
                // Formulas are rolled before apply; an unrolled one counts as zero.
                let value = amount.fixed().unwrap_or_default();
                let landed = apply_delta(kingdom, resource, value);
                Ok((landed != 0).then(|| format!("{} {landed:+}", resource.label())))
            }
            Self::Imprison {
                allocations,
                amount,
                mode,
            } => apply_imprison(kingdom, catalog, &allocations, amount, mode),
            Self::Release {
                withdrawals,
                to_unrest,
            } => Ok(apply_release(kingdom, &withdrawals, to_unrest)),
            Self::TransferSettlement {
                settlement_id,
                faction_id,
            } => apply_transfer_settlement(kingdom, settlement_id, faction_id),
            Self::TransferArmy { army_id, faction_id } => {
                let army = kingdom
                    .army_mut(army_id)
                    .ok_or(CommandError::ArmyNotFound(army_id))?;
                if !army.is_player_led() {
                    return Err(CommandError::NotControlled(army.name.clone()));
                }
                army.leader = Controller::Faction(faction_id);
                army.supported_by = None;
                Ok(Some(format!("{} defected", army.name)))
            }
            Self::SeizeHexes { hexes, faction_id } => {
                let taken = reassign_hexes(kingdom, &hexes, Controller::Faction(faction_id));
                Ok((taken > 0).then(|| format!("Lost {taken} hexes to a rival faction")))
            }
            Self::AbandonHexes { hexes } => {
                let released = reassign_hexes(kingdom, &hexes, Controller::Wilderness);
                Ok((released > 0).then(|| format!("Abandoned {released} hexes")))
            }
            Self::RecruitArmy { army } => {
                let message = format!("Recruited {} (level {})", army.name, army.level);
                kingdom.armies.push(army);
                Ok(Some(message))
            }
            Self::DisbandArmy { army_id } => {
                let position = kingdom
                    .armies
                    .iter()
                    .position(|a| a.id == army_id)
                    .ok_or(CommandError::ArmyNotFound(army_id))?;
                let army = kingdom.armies.remove(position);
                Ok(Some(format!("Disbanded {}", army.name)))
            }
            Self::TrainArmy { army_id, level } => {
                let army = kingdom
                    .army_mut(army_id)
                    .ok_or(CommandError::ArmyNotFound(army_id))?;
                army.level = army.level.max(level);
                Ok(Some(format!("{} trained to level {}", army.name, army.level)))
            }
            Self::OutfitArmy { army_id, slot } => {
                let army = kingdom
                    .army_mut(army_id)
                    .ok_or(CommandError::ArmyNotFound(army_id))?;
                Ok(army
                    .equipment
                    .grant(slot)
                    .then(|| format!("{} received {}", army.name, slot.label())))
            }
            Self::DamageStructures { targets } => {
                let mut damaged = 0u32;
                for target in &targets {
                    if let Some(settlement) = kingdom.settlement_mut(target.settlement_id)
                        && let Some(built) = settlement
                            .structures
                            .iter_mut()
                            .find(|s| s.key == target.structure && !s.damaged)
                    {
                        built.damaged = true;
                        damaged = damaged.saturating_add(1);
                    }
                }
                release_overflow(kingdom, catalog);
                Ok((damaged > 0).then(|| format!("{damaged} structures damaged")))
            }
            Self::RemoveStructure { target } => {
                let settlement = kingdom
                    .settlement_mut(target.settlement_id)
                    .ok_or(CommandError::SettlementNotFound(target.settlement_id))?;
                let position = settlement
                    .structures
                    .iter()
                    .position(|s| s.key == target.structure)
                    .ok_or_else(|| CommandError::StructureMissing {
                        structure: target.structure.clone(),
                        settlement: target.settlement_id,
                    })?;
                settlement.structures.remove(position);
                let message = format!("{} removed from {}", target.structure, settlement.name);
                release_overflow(kingdom, catalog);
                Ok(Some(message))
            }
            Self::GrantStructure { target } => {
                if !grant_structure(kingdom, target.settlement_id, &target.structure) {
                    return Err(CommandError::SettlementNotFound(target.settlement_id));
                }
                Ok(Some(format!("Gained {}", target.structure)))
            }
            Self::AddModifier { modifier } => {
                let message = format!("{} now affects {}", modifier.name, modifier.resource.label());
                kingdom.modifiers.push(modifier);
                Ok(Some(message))
            }
        }
    }
}

/// Fill each planned prison, re-clamped to the room it has now. Whatever
/// does not fit becomes unrest (new) or stays unrest (existing).
fn apply_imprison(
    kingdom: &mut Kingdom,
    catalog: &Catalog,
    allocations: &[PrisonAllocation],
    amount: u32,
    mode: ImprisonMode,
) -> Result<Option<String>, CommandError> {
    let available_unrest = u32::try_from(kingdom.resource(Resource::Unrest)).unwrap_or(0);
    let requested = match mode {
        ImprisonMode::NewUnrest => amount,
        ImprisonMode::ExistingUnrest => amount.min(available_unrest),
    };

    let mut imprisoned = 0u32;
    let mut placed = Vec::new();
    for allocation in allocations {
        let left = requested.saturating_sub(imprisoned);
        if left == 0 {
            break;
        }
        let settlement = kingdom
            .settlement_mut(allocation.settlement_id)
            .ok_or(CommandError::SettlementNotFound(allocation.settlement_id))?;
        let jailed = allocation
            .amount
            .min(left)
            .min(remaining_capacity(settlement, catalog));
        if jailed > 0 {
            settlement.imprisoned_unrest = settlement.imprisoned_unrest.saturating_add(jailed);
            imprisoned = imprisoned.saturating_add(jailed);
            placed.push(format!("{jailed} in {}", settlement.name));
        }
    }
    let overflow = requested.saturating_sub(imprisoned);

    match mode {
        ImprisonMode::NewUnrest => {
            kingdom.adjust_resource(Resource::Unrest, i32::try_from(overflow).unwrap_or(i32::MAX));
        }
        ImprisonMode::ExistingUnrest => {
            kingdom.adjust_resource(
                Resource::Unrest,
                i32::try_from(imprisoned).unwrap_or(i32::MAX).saturating_neg(),
            );
        }
    }

    let mut parts = Vec::new();
    if imprisoned > 0 {
        parts.push(format!("{imprisoned} unrest imprisoned ({})", placed.join(", ")));
    }
    if overflow > 0 && mode == ImprisonMode::NewUnrest {
        parts.push(format!("{overflow} unrest with no prison room"));
    }
    Ok((!parts.is_empty()).then(|| parts.join("; ")))
}

fn apply_release(kingdom: &mut Kingdom, withdrawals: &[Withdrawal], to_unrest: bool) -> Option<String> {
    let mut released = 0u32;
    for withdrawal in withdrawals {
        if let Some(settlement) = kingdom.settlement_mut(withdrawal.settlement_id) {
            let taken = withdrawal.amount.min(settlement.imprisoned_unrest);
            settlement.imprisoned_unrest = settlement.imprisoned_unrest.saturating_sub(taken);
            released = released.saturating_add(taken);
        }
    }
    if to_unrest {
        kingdom.adjust_resource(Resource::Unrest, i32::try_from(released).unwrap_or(i32::MAX));
    }
    (released > 0).then(|| format!("{released} imprisoned unrest released"))
}

fn apply_transfer_settlement(
    kingdom: &mut Kingdom,
    settlement_id: SettlementId,
    faction_id: FactionId,
) -> Result<Option<String>, CommandError> {
    let settlement = kingdom
        .settlement(settlement_id)
        .ok_or(CommandError::SettlementNotFound(settlement_id))?;
    if !settlement_controlled(kingdom, settlement) {
        return Err(CommandError::NotControlled(settlement.name.clone()));
    }
    let hex = settlement.hex;

    kingdom.settlements.retain(|s| s.id != settlement_id);
    if let Some(tile) = kingdom.hex_mut(hex) {
        tile.controller = Controller::Faction(faction_id);
    }
    kingdom.build_queue.retain(|p| p.settlement_id != settlement_id);
    for army in &mut kingdom.armies {
        if army.supported_by == Some(settlement_id) {
            army.supported_by = None;
        }
    }
    Ok(Some(format!("Settlement at {hex} lost to a rival faction")))
}

/// Whether the kingdom controls `settlement`: it is on the kingdom's list
/// and its hex, if mapped, belongs to the kingdom.
pub fn settlement_controlled(kingdom: &Kingdom, settlement: &Settlement) -> bool {
    kingdom.settlement(settlement.id).is_some()
        && kingdom
            .hex(settlement.hex)
            .is_none_or(|hex| hex.controller.is_kingdom())
}

/// Move kingdom hexes without a settlement to `controller`. Returns how many
/// changed hands.
fn reassign_hexes(kingdom: &mut Kingdom, hexes: &[HexCoord], controller: Controller) -> usize {
    let mut changed = 0usize;
    for coord in hexes {
        if kingdom.has_settlement_at(*coord) {
            continue;
        }
        if let Some(hex) = kingdom.hex_mut(*coord)
            && hex.controller.is_kingdom()
        {
            hex.controller = controller;
            changed = changed.saturating_add(1);
        }
    }
    changed
}

/// Return imprisoned unrest above each settlement's capacity to the
/// kingdom's unrest.
fn release_overflow(kingdom: &mut Kingdom, catalog: &Catalog) {
    let mut freed = 0u32;
    for settlement in &mut kingdom.settlements {
        let capacity = imprisonment_capacity(settlement, catalog);
        if settlement.imprisoned_unrest > capacity {
            freed = freed.saturating_add(settlement.imprisoned_unrest.saturating_sub(capacity));
            settlement.imprisoned_unrest = capacity;
        }
    }
    if freed > 0 {
        debug!(freed, "prison capacity lost, unrest released");
        kingdom.adjust_resource(Resource::Unrest, i32::try_from(freed).unwrap_or(i32::MAX));
    }
}
