// # Reconciliation State
//
// In-memory state owned by the reconciler. Nothing here is persisted.

pub mod memory;

pub use memory::{AddressCache, CachedAddress};
