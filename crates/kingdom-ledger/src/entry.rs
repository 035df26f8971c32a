//! Ledger entry values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kingdom_types::Resource;

/// Category of a resource movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    /// Settlement or worksite income.
    Income,
    /// Food eaten by a settlement.
    SettlementFood,
    /// Food eaten by an army.
    ArmyFood,
    /// Gold paid to an army.
    ArmyGold,
    /// Gold paid to keep a fortification in repair.
    FortificationMaintenance,
    /// Materials paid into a build project.
    BuildInvestment,
    /// Materials returned by a cancelled build project.
    BuildRefund,
    /// Delta from an ongoing modifier.
    ModifierDelta,
}

/// Which way a movement goes relative to the kingdom treasury.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Resources enter the treasury.
    Credit,
    /// Resources leave the treasury.
    Debit,
}

/// One recorded movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier (UUID v7).
    pub id: Uuid,
    /// Turn the movement happened in.
    pub turn: u32,
    /// Category.
    pub entry_type: LedgerEntryType,
    /// Resource moved.
    pub resource: Resource,
    /// Strictly positive quantity.
    pub quantity: u32,
    /// Credit or debit.
    pub direction: Direction,
    /// Related entity (settlement, army, project), if any.
    pub reference_id: Option<Uuid>,
    /// Human-readable reason.
    pub reason: String,
    /// Wall-clock time of recording.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// The quantity as a signed change to the treasury.
    pub fn signed_quantity(&self) -> i64 {
        match self.direction {
            Direction::Credit => i64::from(self.quantity),
            Direction::Debit => i64::from(self.quantity).saturating_neg(),
        }
    }
}
