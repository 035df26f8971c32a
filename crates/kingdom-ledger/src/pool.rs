//! The shared resource pool an allocation pass draws from.
//!
//! A pool is opened from the kingdom's resource map at the start of a pass.
//! Negative stockpiles open as zero: a kingdom in debt has nothing to spend,
//! but the debt is preserved because only the pool's net change is written
//! back. Every withdrawal is immediately visible to later withdrawals in
//! the same pass.

use std::collections::BTreeMap;

use kingdom_types::{Kingdom, Resource};

use crate::LedgerError;
use crate::conservation::{ConservationResult, verify_conservation};
use crate::entry::{Direction, LedgerEntryType};
use crate::ledger::{EntryParams, Ledger};

/// A per-pass snapshot of spendable resources with a movement ledger.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    turn: u32,
    opening: BTreeMap<Resource, u32>,
    available: BTreeMap<Resource, u32>,
    ledger: Ledger,
}

impl ResourcePool {
    /// Open a pool from a signed resource map.
    pub fn new(turn: u32, resources: &BTreeMap<Resource, i32>) -> Self {
        let opening: BTreeMap<Resource, u32> = resources
            .iter()
            .map(|(resource, value)| (*resource, u32::try_from(*value).unwrap_or(0)))
            .collect();
        Self {
            turn,
            available: opening.clone(),
            opening,
            ledger: Ledger::new(),
        }
    }

    /// Open a pool over the kingdom's current resources.
    pub fn from_kingdom(kingdom: &Kingdom) -> Self {
        Self::new(kingdom.turn, &kingdom.resources)
    }

    /// Turn the pool was opened for.
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Quantity of `resource` still available.
    pub fn available(&self, resource: Resource) -> u32 {
        self.available.get(&resource).copied().unwrap_or(0)
    }

    /// Quantity of `resource` the pool opened with.
    pub fn opening(&self, resource: Resource) -> u32 {
        self.opening.get(&resource).copied().unwrap_or(0)
    }

    /// Withdraw as much of `requested` as is available. Returns the amount
    /// actually withdrawn; nothing is recorded when that is zero.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the debit cannot be recorded. The pool is
    /// left unchanged.
    pub fn withdraw_up_to(
        &mut self,
        resource: Resource,
        requested: u32,
        entry_type: LedgerEntryType,
        reason: impl Into<String>,
    ) -> Result<u32, LedgerError> {
        let on_hand = self.available(resource);
        let paid = requested.min(on_hand);
        if paid > 0 {
            self.ledger.record(EntryParams {
                turn: self.turn,
                entry_type,
                resource,
                quantity: paid,
                direction: Direction::Debit,
                reason: reason.into(),
                reference_id: None,
            })?;
            self.available.insert(resource, on_hand.saturating_sub(paid));
        }
        Ok(paid)
    }

    /// Withdraw exactly `requested`, or nothing at all.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] when the pool cannot cover
    /// the full amount. The pool is left unchanged.
    pub fn try_withdraw(
        &mut self,
        resource: Resource,
        requested: u32,
        entry_type: LedgerEntryType,
        reason: impl Into<String>,
    ) -> Result<(), LedgerError> {
        let available = self.available(resource);
        if available < requested {
            return Err(LedgerError::InsufficientFunds {
                resource,
                requested,
                available,
            });
        }
        self.withdraw_up_to(resource, requested, entry_type, reason)?;
        Ok(())
    }

    /// Add `amount` of `resource` to the pool.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the running total would overflow.
    pub fn deposit(
        &mut self,
        resource: Resource,
        amount: u32,
        entry_type: LedgerEntryType,
        reason: impl Into<String>,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let total = self
            .available(resource)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { resource })?;
        self.available.insert(resource, total);
        self.ledger.record(EntryParams {
            turn: self.turn,
            entry_type,
            resource,
            quantity: amount,
            direction: Direction::Credit,
            reason: reason.into(),
            reference_id: None,
        })?;
        Ok(())
    }

    /// Signed change of `resource` since the pool was opened.
    pub fn net_change(&self, resource: Resource) -> i64 {
        i64::from(self.available(resource)).saturating_sub(i64::from(self.opening(resource)))
    }

    /// Apply the pool's net changes to the kingdom's resource map.
    pub fn write_back(&self, kingdom: &mut Kingdom) {
        for resource in self.available.keys() {
            let delta = self.net_change(*resource);
            if delta != 0 {
                let clamped = i32::try_from(delta)
                    .unwrap_or(if delta < 0 { i32::MIN } else { i32::MAX });
                kingdom.adjust_resource(*resource, clamped);
            }
        }
    }

    /// Check the pool's closing balances against its ledger.
    pub fn verify_conservation(&self) -> ConservationResult {
        verify_conservation(
            self.turn,
            &self.opening,
            &self.available,
            self.ledger.all_entries(),
        )
    }

    /// The movements recorded so far.
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Consume the pool, returning its ledger.
    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }
}
