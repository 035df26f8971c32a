//! Settlement feeding.
//!
//! Settlements are fed in priority order: the capital first, then by tier
//! from largest to smallest, ties keeping founding order. Each settlement
//! needs the food listed for its tier. A settlement that cannot be fed in
//! full generates unrest equal to its tier ordinal and is marked unfed for
//! the next income collection.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use kingdom_ledger::{LedgerEntry, LedgerEntryType, LedgerError, ResourcePool};
use kingdom_types::{Kingdom, Resource, Settlement, SettlementId};
use kingdom_world::Catalog;

use crate::config::{EconomyRules, FeedingPolicy};
use crate::error::EconomyError;
use crate::pass::close_pool;

/// Result of a feeding pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedingReport {
    /// Settlements fed, in feeding order.
    pub fed: Vec<SettlementId>,
    /// Settlements left unfed, in feeding order.
    pub unfed: Vec<SettlementId>,
    /// Total food eaten.
    pub food_consumed: u32,
    /// Unrest generated by unfed settlements.
    pub unrest: u32,
    /// Food movements.
    pub ledger: Vec<LedgerEntry>,
}

/// Indices of `settlements` in feeding priority order.
pub fn feeding_order(settlements: &[Settlement]) -> Vec<usize> {
    let mut keyed: Vec<(usize, bool, Reverse<_>)> = settlements
        .iter()
        .enumerate()
        .map(|(i, s)| (i, !s.is_capital, Reverse(s.tier)))
        .collect();
    keyed.sort_by_key(|(_, not_capital, tier)| (*not_capital, *tier));
    keyed.into_iter().map(|(i, _, _)| i).collect()
}

/// Feed `settlements` from `pool`. Returns the report without a ledger.
///
/// # Errors
///
/// Returns [`LedgerError`] if a debit cannot be recorded. A shortfall is
/// not an error.
pub fn allocate_food(
    settlements: &mut [Settlement],
    pool: &mut ResourcePool,
    catalog: &Catalog,
    policy: FeedingPolicy,
) -> Result<FeedingReport, LedgerError> {
    let mut report = FeedingReport::default();

    for index in feeding_order(settlements) {
        let Some(settlement) = settlements.get_mut(index) else {
            continue;
        };
        let required = catalog.food_requirement(settlement.tier);

        let fed = match pool.try_withdraw(
            Resource::Food,
            required,
            LedgerEntryType::SettlementFood,
            settlement.name.as_str(),
        ) {
            Ok(()) => true,
            Err(LedgerError::InsufficientFunds { .. }) => false,
            Err(err) => return Err(err),
        };

        if fed {
            report.food_consumed = report.food_consumed.saturating_add(required);
            report.fed.push(settlement.id);
        } else {
            if policy == FeedingPolicy::ExhaustOnShortfall {
                let eaten = pool.withdraw_up_to(
                    Resource::Food,
                    required,
                    LedgerEntryType::SettlementFood,
                    settlement.name.as_str(),
                )?;
                report.food_consumed = report.food_consumed.saturating_add(eaten);
            }
            report.unrest = report.unrest.saturating_add(settlement.tier.ordinal());
            report.unfed.push(settlement.id);
            debug!(
                settlement = %settlement.name,
                tier = settlement.tier.label(),
                required,
                "settlement unfed"
            );
        }
        settlement.fed_last_turn = fed;
    }

    Ok(report)
}

/// Run the feeding pass against the kingdom and apply its unrest.
///
/// # Errors
///
/// Returns [`EconomyError::ConservationViolated`] if the pass's ledger
/// does not balance, or [`EconomyError::Ledger`] if a debit cannot be
/// recorded.
pub fn feed_settlements(
    kingdom: &mut Kingdom,
    catalog: &Catalog,
    rules: &EconomyRules,
) -> Result<FeedingReport, EconomyError> {
    let mut pool = ResourcePool::from_kingdom(kingdom);
    let mut report = allocate_food(&mut kingdom.settlements, &mut pool, catalog, rules.feeding_policy)?;
    report.ledger = close_pool(pool, kingdom)?;

    let unrest = i32::try_from(report.unrest).unwrap_or(i32::MAX);
    kingdom.adjust_resource(Resource::Unrest, unrest);

    info!(
        turn = kingdom.turn,
        fed = report.fed.len(),
        unfed = report.unfed.len(),
        food = report.food_consumed,
        unrest = report.unrest,
        "settlements fed"
    );
    Ok(report)
}
