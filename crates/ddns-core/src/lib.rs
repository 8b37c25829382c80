// # ddns-core
//
// Core library for the polling DDNS reconciler.
//
// ## Architecture Overview
//
// This library keeps one DNS record name pointed at the host's public
// address(es), one independent track per IP version:
// - **AddressLookup**: Trait for fetching the current public address from an endpoint
// - **RecordStore**: Trait for resolving and updating records via provider APIs
// - **Reconciler**: Runs one pass (resolve → detect → update) over every enabled track
// - **Scheduler**: Runs a pass immediately, then on a fixed interval
// - **discover**: Startup resolution of the zone and of the records to manage
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider and lookup implementations
// 2. **Single Timeline**: Passes never overlap; the cache is owned, not shared
// 3. **Idempotency**: An address is pushed only when it differs from the last one resolved
// 4. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod state;

// Re-export core types for convenience
pub use traits::{AddressLookup, IpVersion, RecordId, RecordStore, RecordType, ZoneId};
pub use engine::{
    PassReport, ReconcileContext, ReconcileEvent, Reconciler, Scheduler, Track, TrackOutcome,
    Zone, discover,
};
pub use config::{
    CloudflareAuth, DdnsConfig, EngineConfig, ProviderConfig, TrackConfig, UpdateFailurePolicy,
};
pub use error::{Error, Result};
pub use state::AddressCache;
