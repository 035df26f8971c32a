//! Closing an allocation pass.

use tracing::error;

use kingdom_ledger::{ConservationResult, LedgerEntry, ResourcePool};
use kingdom_types::Kingdom;

use crate::error::EconomyError;

/// Verify the pool, write its net change into `kingdom`, and return the
/// pass's ledger entries.
///
/// # Errors
///
/// Returns [`EconomyError::ConservationViolated`] and leaves `kingdom`
/// untouched when the pool's balances disagree with its ledger.
pub fn close_pool(pool: ResourcePool, kingdom: &mut Kingdom) -> Result<Vec<LedgerEntry>, EconomyError> {
    if let ConservationResult::Anomaly(anomaly) = pool.verify_conservation() {
        error!(turn = anomaly.turn, "{anomaly}");
        return Err(EconomyError::ConservationViolated(anomaly));
    }
    pool.write_back(kingdom);
    Ok(pool.into_ledger().into_entries())
}
