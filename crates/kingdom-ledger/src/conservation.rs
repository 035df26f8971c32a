//! Conservation verification for a resource pool.
//!
//! For each resource R the check is:
//!
//! ```text
//! opening(R) + credits(R) - debits(R) == closing(R)
//! debits(R) <= opening(R) + credits(R)
//! ```
//!
//! The pool maintains both by construction. The check exists to catch a
//! pass that edits balances without going through the pool.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use kingdom_types::Resource;

use crate::LedgerAnomaly;
use crate::entry::{Direction, LedgerEntry};

/// The result of a conservation check for a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// Every resource balances.
    Balanced,
    /// One or more resources do not balance.
    Anomaly(LedgerAnomaly),
}

impl ConservationResult {
    /// Whether the check passed.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Verify that `closing` equals `opening` plus the net of `entries` for
/// `turn`, and that no resource was overdrawn.
pub fn verify_conservation(
    turn: u32,
    opening: &BTreeMap<Resource, u32>,
    closing: &BTreeMap<Resource, u32>,
    entries: &[LedgerEntry],
) -> ConservationResult {
    let mut credits: BTreeMap<Resource, i64> = BTreeMap::new();
    let mut debits: BTreeMap<Resource, i64> = BTreeMap::new();

    for entry in entries.iter().filter(|e| e.turn == turn) {
        let bucket = match entry.direction {
            Direction::Credit => &mut credits,
            Direction::Debit => &mut debits,
        };
        let v = bucket.entry(entry.resource).or_insert(0);
        *v = v.saturating_add(i64::from(entry.quantity));
    }

    let all_resources: BTreeSet<Resource> = opening
        .keys()
        .chain(closing.keys())
        .chain(credits.keys())
        .chain(debits.keys())
        .copied()
        .collect();

    let mut imbalances: BTreeMap<Resource, (i64, i64)> = BTreeMap::new();

    for resource in &all_resources {
        let open = i64::from(opening.get(resource).copied().unwrap_or(0));
        let close = i64::from(closing.get(resource).copied().unwrap_or(0));
        let credit = credits.get(resource).copied().unwrap_or(0);
        let debit = debits.get(resource).copied().unwrap_or(0);

        let funded = open.saturating_add(credit);
        let expected = funded.saturating_sub(debit);
        if expected != close || debit > funded {
            imbalances.insert(*resource, (expected, close));
        }
    }

    if imbalances.is_empty() {
        ConservationResult::Balanced
    } else {
        let count = imbalances.len();
        let anomaly = LedgerAnomaly {
            turn,
            imbalances,
            message: format!(
                "LEDGER_ANOMALY at turn {turn}: conservation violated for {count} resource(s)",
            ),
        };
        warn!(turn, count, "{anomaly}");
        ConservationResult::Anomaly(anomaly)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::entry::LedgerEntryType;

    use super::*;

    fn entry(resource: Resource, quantity: u32, direction: Direction) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::now_v7(),
            turn: 1,
            entry_type: LedgerEntryType::BuildInvestment,
            resource,
            quantity,
            direction,
            reference_id: None,
            reason: "test".to_owned(),
            created_at: Utc::now(),
        }
    }

    fn map(pairs: &[(Resource, u32)]) -> BTreeMap<Resource, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn empty_pass_is_balanced() {
        let opening = map(&[(Resource::Gold, 3)]);
        let result = verify_conservation(1, &opening, &opening, &[]);
        assert_eq!(result, ConservationResult::Balanced);
    }

    #[test]
    fn matching_debits_balance() {
        let opening = map(&[(Resource::Lumber, 5)]);
        let closing = map(&[(Resource::Lumber, 2)]);
        let entries = vec![entry(Resource::Lumber, 3, Direction::Debit)];
        assert!(verify_conservation(1, &opening, &closing, &entries).is_balanced());
    }

    #[test]
    fn unrecorded_change_is_an_anomaly() {
        let opening = map(&[(Resource::Stone, 5)]);
        let closing = map(&[(Resource::Stone, 1)]);
        let entries = vec![entry(Resource::Stone, 3, Direction::Debit)];
        match verify_conservation(1, &opening, &closing, &entries) {
            ConservationResult::Anomaly(anomaly) => {
                assert_eq!(anomaly.imbalances.get(&Resource::Stone), Some(&(2, 1)));
            }
            other => panic!("Expected Anomaly, got {other:?}"),
        }
    }

    #[test]
    fn overdraft_is_an_anomaly_even_when_totals_match() {
        let opening = map(&[(Resource::Gold, 1)]);
        let closing = map(&[]);
        // Closing cannot go negative in a pool, so the only way to get here
        // is a debit larger than what was funded.
        let entries = vec![entry(Resource::Gold, 2, Direction::Debit)];
        assert!(!verify_conservation(1, &opening, &closing, &entries).is_balanced());
    }
}
