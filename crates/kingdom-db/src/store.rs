//! The persistence contract every kingdom store implements.
//!
//! A store holds exactly one kingdom. Reads return an owned snapshot.
//! Writes go through [`KingdomStore::update`], which runs a closure against
//! a working copy of the current state and persists the copy only when the
//! closure returns `Ok`. Updates on one store are serialized, so a guard
//! checked inside the closure still holds when its mutation lands.

use std::future::Future;

use kingdom_types::Kingdom;

use crate::error::StoreError;

/// Transactional read-modify-write access to one kingdom.
pub trait KingdomStore: Send + Sync {
    /// Snapshot of the current state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read.
    fn current(&self) -> impl Future<Output = Result<Kingdom, StoreError>> + Send;

    /// Apply `f` to the current state atomically.
    ///
    /// On `Err` the stored state is left exactly as it was. The store's own
    /// failures are converted into `E`.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or the store's error converted to `E`.
    fn update<T, E, F>(&self, f: F) -> impl Future<Output = Result<T, E>> + Send
    where
        F: FnOnce(&mut Kingdom) -> Result<T, E> + Send,
        T: Send,
        E: From<StoreError> + Send;
}
