//! Status-phase resource collection.
//!
//! Settlements fed at the last upkeep pay gold by kingdom level and tier.
//! Worksites on kingdom-controlled hexes produce their listed yield.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use kingdom_ledger::{LedgerEntry, LedgerEntryType, ResourcePool};
use kingdom_types::{HexCoord, Kingdom, Resource, SettlementId};
use kingdom_world::Catalog;

use crate::error::EconomyError;
use crate::pass::close_pool;

/// Result of an income collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IncomeReport {
    /// Gold paid by each contributing settlement.
    pub settlement_gold: Vec<(SettlementId, u32)>,
    /// Yields by worksite hex.
    pub worksite_yields: Vec<(HexCoord, Resource, u32)>,
    /// Income entries.
    pub ledger: Vec<LedgerEntry>,
}

impl IncomeReport {
    /// Total collected per resource.
    pub fn totals(&self) -> BTreeMap<Resource, u32> {
        let mut totals = BTreeMap::new();
        let gold: u32 = self.settlement_gold.iter().map(|(_, g)| *g).sum();
        if gold > 0 {
            totals.insert(Resource::Gold, gold);
        }
        for (_, resource, amount) in &self.worksite_yields {
            let entry = totals.entry(*resource).or_insert(0u32);
            *entry = entry.saturating_add(*amount);
        }
        totals
    }
}

/// Collect settlement gold and worksite yields into the kingdom.
///
/// # Errors
///
/// Returns [`EconomyError`] if a deposit fails or the pass does not
/// balance.
pub fn collect_income(kingdom: &mut Kingdom, catalog: &Catalog) -> Result<IncomeReport, EconomyError> {
    let mut report = IncomeReport::default();
    let mut pool = ResourcePool::from_kingdom(kingdom);

    for settlement in kingdom.settlements.iter().filter(|s| s.fed_last_turn) {
        let gold = catalog.settlement_gold(kingdom.level, settlement.tier);
        if gold == 0 {
            continue;
        }
        pool.deposit(Resource::Gold, gold, LedgerEntryType::Income, settlement.name.as_str())?;
        report.settlement_gold.push((settlement.id, gold));
    }

    for hex in kingdom.hexes.iter().filter(|h| h.controller.is_kingdom()) {
        let Some(worksite) = hex.worksite else {
            continue;
        };
        let Some(yield_row) = catalog.worksite_yield(worksite) else {
            continue;
        };
        if yield_row.amount == 0 {
            continue;
        }
        pool.deposit(
            yield_row.resource,
            yield_row.amount,
            LedgerEntryType::Income,
            format!("worksite at {}", hex.coord),
        )?;
        report
            .worksite_yields
            .push((hex.coord, yield_row.resource, yield_row.amount));
    }

    report.ledger = close_pool(pool, kingdom)?;

    info!(
        turn = kingdom.turn,
        settlements = report.settlement_gold.len(),
        worksites = report.worksite_yields.len(),
        "income collected"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kingdom_types::{Controller, FactionId, Hex, Settlement, SettlementTier, Worksite};

    use super::*;

    #[test]
    fn only_fed_settlements_pay_gold() {
        let mut k = Kingdom::new("Test");
        let mut fed = Settlement::new("Fed", SettlementTier::Town, HexCoord::default());
        fed.fed_last_turn = true;
        let hungry = Settlement::new("Hungry", SettlementTier::City, HexCoord::new(1, 0));
        k.settlements = vec![fed, hungry];

        let report = collect_income(&mut k, &Catalog::standard()).unwrap();

        assert_eq!(report.settlement_gold.len(), 1);
        assert_eq!(k.resource(Resource::Gold), 2);
    }

    #[test]
    fn gold_scales_with_kingdom_level() {
        let mut k = Kingdom::new("Test");
        k.level = 10;
        let mut city = Settlement::new("City", SettlementTier::City, HexCoord::default());
        city.fed_last_turn = true;
        k.settlements.push(city);
        collect_income(&mut k, &Catalog::standard()).unwrap();
        assert_eq!(k.resource(Resource::Gold), 6);
    }

    #[test]
    fn worksites_yield_only_on_kingdom_hexes() {
        let mut k = Kingdom::new("Test");
        let mut farm = Hex::new(HexCoord::new(0, 1), Controller::Kingdom);
        farm.worksite = Some(Worksite::Farmland);
        let mut quarry = Hex::new(HexCoord::new(1, 0), Controller::Kingdom);
        quarry.worksite = Some(Worksite::Quarry);
        let mut lost = Hex::new(HexCoord::new(2, 0), Controller::Faction(FactionId::new()));
        lost.worksite = Some(Worksite::Mine);
        k.hexes = vec![farm, quarry, lost];

        let report = collect_income(&mut k, &Catalog::standard()).unwrap();

        assert_eq!(k.resource(Resource::Food), 2);
        assert_eq!(k.resource(Resource::Stone), 1);
        assert_eq!(k.resource(Resource::Ore), 0);
        assert_eq!(report.totals().get(&Resource::Food), Some(&2));
        assert_eq!(report.ledger.len(), 2);
    }
}
