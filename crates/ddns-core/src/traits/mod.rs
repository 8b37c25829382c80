//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressLookup`]: Fetch the current public address from an endpoint
//! - [`RecordStore`]: Resolve and update records via provider APIs

pub mod address_lookup;
pub mod record_store;

pub use address_lookup::{AddressLookup, IpVersion};
pub use record_store::{RecordId, RecordStore, RecordType, ZoneId};
