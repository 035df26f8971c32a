//! Kingdom state stores for the kingdom turn engine.
//!
//! Every mutation of a kingdom goes through one transactional primitive,
//! [`KingdomStore::update`]. The command pipeline and the turn controller
//! are generic over the store, so the same code runs against memory in
//! tests and against `Dragonfly` in a deployment.
//!
//! # Modules
//!
//! - [`store`] -- The [`KingdomStore`] trait.
//! - [`memory`] -- [`MemoryStore`], a mutex-guarded in-process store with
//!   revision notifications.
//! - [`dragonfly`] -- [`DragonflyStore`], JSON state at `kingdom:{id}:state`.
//! - [`error`] -- Shared error types.

pub mod dragonfly;
pub mod error;
pub mod memory;
pub mod store;

// Re-export primary types for convenience.
pub use dragonfly::{DragonflyPool, DragonflyStore, kingdom_state_key};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::KingdomStore;
