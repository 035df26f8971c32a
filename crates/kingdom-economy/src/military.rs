//! Military support and fortification maintenance.
//!
//! Every kingdom-led army that is not exempt eats food and draws gold each
//! upkeep, in recruitment order. Food and gold are paid independently and
//! all-or-nothing per army. The unrest from a pass is the larger of the two
//! shortfall counts, so an army short on both counts once.
//!
//! Army pay comes before fortification maintenance. Fortifications built
//! this turn owe nothing; those that cannot be paid are flagged so their
//! defensive bonus drops a tier.
//!
//! An army unsupported for more consecutive upkeeps than the configured
//! limit disbands.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kingdom_ledger::{LedgerEntry, LedgerEntryType, ResourcePool};
use kingdom_types::{ArmyId, HexCoord, Kingdom, Resource};
use kingdom_world::Catalog;

use crate::config::EconomyRules;
use crate::error::EconomyError;
use crate::pass::close_pool;

/// An army removed for going unsupported too long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbandedArmy {
    /// Identifier of the removed army.
    pub id: ArmyId,
    /// Its name, for the log.
    pub name: String,
}

/// Result of a military support pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MilitaryReport {
    /// Armies that received full support.
    pub supported: Vec<ArmyId>,
    /// Armies that could not be fed.
    pub food_shortfall: u32,
    /// Armies that could not be paid.
    pub gold_shortfall: u32,
    /// Unrest generated: `max(food_shortfall, gold_shortfall)`.
    pub unrest: u32,
    /// Armies disbanded after exceeding the unsupported limit.
    pub disbanded: Vec<DisbandedArmy>,
    /// Fortifications whose maintenance was paid.
    pub maintained: Vec<HexCoord>,
    /// Fortifications left unpaid.
    pub unmaintained: Vec<HexCoord>,
    /// Food and gold movements.
    pub ledger: Vec<LedgerEntry>,
}

/// Whether any army or fortification owes upkeep this turn.
pub fn needs_support(kingdom: &Kingdom, catalog: &Catalog) -> bool {
    kingdom.armies.iter().any(kingdom_types::Army::needs_support)
        || !owed_fortifications(kingdom, catalog).is_empty()
}

/// Fortifications on kingdom hexes that owe maintenance this turn, with
/// the amount owed, in map order.
fn owed_fortifications(kingdom: &Kingdom, catalog: &Catalog) -> Vec<(HexCoord, u32)> {
    kingdom
        .hexes
        .iter()
        .filter(|hex| hex.controller.is_kingdom())
        .filter_map(|hex| {
            let fort = hex.fortification.as_ref()?;
            if fort.built_turn >= kingdom.turn {
                return None;
            }
            let cost = catalog.fortification(fort.tier).map_or(0, |tier| tier.maintenance);
            (cost > 0).then_some((hex.coord, cost))
        })
        .collect()
}

/// Pay armies, then fortifications, from `pool`. Mutates army support
/// state and fortification flags but not the kingdom's resources.
pub fn allocate_support(
    kingdom: &mut Kingdom,
    pool: &mut ResourcePool,
    catalog: &Catalog,
    rules: &EconomyRules,
) -> MilitaryReport {
    let mut report = MilitaryReport::default();

    for army in &mut kingdom.armies {
        if !army.needs_support() {
            army.is_supported = true;
            army.turns_unsupported = 0;
            continue;
        }

        let fed = pool
            .try_withdraw(Resource::Food, rules.army_food_upkeep, LedgerEntryType::ArmyFood, army.name.as_str())
            .is_ok();
        let paid = pool
            .try_withdraw(Resource::Gold, rules.army_gold_upkeep, LedgerEntryType::ArmyGold, army.name.as_str())
            .is_ok();

        if !fed {
            report.food_shortfall = report.food_shortfall.saturating_add(1);
        }
        if !paid {
            report.gold_shortfall = report.gold_shortfall.saturating_add(1);
        }

        army.is_supported = fed && paid;
        if army.is_supported {
            army.turns_unsupported = 0;
            report.supported.push(army.id);
        } else {
            army.turns_unsupported = army.turns_unsupported.saturating_add(1);
        }
    }
    report.unrest = report.food_shortfall.max(report.gold_shortfall);

    if rules.unsupported_turn_limit > 0 {
        let limit = rules.unsupported_turn_limit;
        kingdom.armies.retain(|army| {
            if army.turns_unsupported > limit {
                warn!(army = %army.name, turns = army.turns_unsupported, "army disbanded for lack of support");
                report.disbanded.push(DisbandedArmy {
                    id: army.id,
                    name: army.name.clone(),
                });
                false
            } else {
                true
            }
        });
    }

    let owed = owed_fortifications(kingdom, catalog);
    for hex in &mut kingdom.hexes {
        if let Some(fort) = hex.fortification.as_mut() {
            fort.maintenance_unpaid = false;
        }
    }
    for (coord, cost) in owed {
        let paid = pool
            .try_withdraw(
                Resource::Gold,
                cost,
                LedgerEntryType::FortificationMaintenance,
                format!("fortification at {coord}"),
            )
            .is_ok();
        if let Some(fort) = kingdom.hex_mut(coord).and_then(|h| h.fortification.as_mut()) {
            fort.maintenance_unpaid = !paid;
        }
        if paid {
            report.maintained.push(coord);
        } else {
            report.unmaintained.push(coord);
        }
    }

    report
}

/// Run the military support pass against the kingdom and apply its unrest.
///
/// # Errors
///
/// Returns [`EconomyError::ConservationViolated`] if the pass's ledger
/// does not balance.
pub fn support_military(
    kingdom: &mut Kingdom,
    catalog: &Catalog,
    rules: &EconomyRules,
) -> Result<MilitaryReport, EconomyError> {
    let mut pool = ResourcePool::from_kingdom(kingdom);
    let mut report = allocate_support(kingdom, &mut pool, catalog, rules);
    report.ledger = close_pool(pool, kingdom)?;

    let unrest = i32::try_from(report.unrest).unwrap_or(i32::MAX);
    kingdom.adjust_resource(Resource::Unrest, unrest);

    info!(
        turn = kingdom.turn,
        supported = report.supported.len(),
        food_shortfall = report.food_shortfall,
        gold_shortfall = report.gold_shortfall,
        unrest = report.unrest,
        disbanded = report.disbanded.len(),
        unmaintained = report.unmaintained.len(),
        "military supported"
    );
    Ok(report)
}
