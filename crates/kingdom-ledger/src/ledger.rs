//! The payment ledger: an append-only log of treasury movements.
//!
//! # Design
//!
//! - **Append-only**: entries are never modified or deleted.
//! - **Single-sided**: the kingdom treasury is the only account, so each
//!   entry is a credit or a debit against it.
//! - **Integer quantities**: resources are whole units; no partial units.

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use kingdom_types::Resource;

use crate::LedgerError;
use crate::entry::{Direction, LedgerEntry, LedgerEntryType};

/// Parameters for recording a movement.
///
/// Packs the arguments of a movement into a single struct to keep call
/// sites readable.
pub struct EntryParams {
    /// The turn number.
    pub turn: u32,
    /// The category of movement.
    pub entry_type: LedgerEntryType,
    /// The resource moved.
    pub resource: Resource,
    /// Quantity moved. Must be non-zero.
    pub quantity: u32,
    /// Credit or debit.
    pub direction: Direction,
    /// Human-readable reason.
    pub reason: String,
    /// Optional reference to a related entity.
    pub reference_id: Option<Uuid>,
}

/// The append-only log of every movement made through a pool.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    /// All entries, in insertion order.
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Create a new empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the number of entries in the ledger.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the ledger has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a movement.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroQuantity`] for an empty movement.
    pub fn record(&mut self, params: EntryParams) -> Result<&LedgerEntry, LedgerError> {
        if params.quantity == 0 {
            return Err(LedgerError::ZeroQuantity);
        }
        self.entries.push(LedgerEntry {
            id: Uuid::now_v7(),
            turn: params.turn,
            entry_type: params.entry_type,
            resource: params.resource,
            quantity: params.quantity,
            direction: params.direction,
            reference_id: params.reference_id,
            reason: params.reason,
            created_at: Utc::now(),
        });
        self.entries.last().ok_or(LedgerError::ZeroQuantity)
    }

    /// Return all entries for a given turn.
    pub fn entries_for_turn(&self, turn: u32) -> Vec<&LedgerEntry> {
        self.entries.iter().filter(|e| e.turn == turn).collect()
    }

    /// Return all entries, in insertion order.
    pub fn all_entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Consume the ledger, returning its entries.
    pub fn into_entries(self) -> Vec<LedgerEntry> {
        self.entries
    }

    /// Sum of `entry_type` debits and credits of `resource` in `turn`,
    /// returned as `(credits, debits)`.
    pub fn totals(&self, turn: u32, entry_type: LedgerEntryType, resource: Resource) -> (u64, u64) {
        self.entries
            .iter()
            .filter(|e| e.turn == turn && e.entry_type == entry_type && e.resource == resource)
            .fold((0u64, 0u64), |(credit, debit), e| match e.direction {
                Direction::Credit => (credit.saturating_add(u64::from(e.quantity)), debit),
                Direction::Debit => (credit, debit.saturating_add(u64::from(e.quantity))),
            })
    }

    /// Net signed change per resource for a turn.
    pub fn net_flow_for_turn(&self, turn: u32) -> BTreeMap<Resource, i64> {
        let mut flows: BTreeMap<Resource, i64> = BTreeMap::new();
        for entry in self.entries.iter().filter(|e| e.turn == turn) {
            let v = flows.entry(entry.resource).or_insert(0);
            *v = v.saturating_add(entry.signed_quantity());
        }
        flows
    }
}
