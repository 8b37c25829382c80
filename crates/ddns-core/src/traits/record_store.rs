// # Record Store Trait
//
// Defines the interface to the DNS provider that owns the managed record.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{RecordStore, RecordType};
//
// #[tokio::main]
// async fn main() -> ddns_core::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     let zone = store.resolve_zone("example.com").await?;
//     if let Some(record) = store.find_record(&zone, "home.example.com", RecordType::A).await? {
//         store.update_record(&zone, &record, "203.0.113.5").await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address record types managed by the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-side zone identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider-side record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for record store implementations
///
/// The store never creates or deletes records. It resolves identifiers once
/// at startup and afterwards only rewrites the `content` of known records.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to the provider only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure (the scheduler decides whether to stop)
///
/// ## Forbidden Capabilities
/// - ❌ Spawn tasks or threads
/// - ❌ Implement retry logic or backoff
/// - ❌ Decide whether an update is needed (owned by the change detector)
/// - ❌ Cache addresses (owned by `Reconciler`)
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Resolve a zone name to the provider's zone identifier
    ///
    /// # Returns
    ///
    /// - `Ok(ZoneId)`: The zone identifier
    /// - `Err(Error::ZoneNotFound)`: The provider has no such zone
    /// - `Err(Error)`: The request failed
    async fn resolve_zone(&self, zone_name: &str) -> Result<ZoneId, crate::Error>;

    /// Locate the record of the given name and type
    ///
    /// Absence is not an error; the caller decides what a missing record
    /// means (for startup discovery it disables the track).
    async fn find_record(
        &self,
        zone: &ZoneId,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordId>, crate::Error>;

    /// Replace the content of an existing record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The provider accepted the new content
    /// - `Err(Error::Update)`: The push was rejected or the call failed
    async fn update_record(
        &self,
        zone: &ZoneId,
        record: &RecordId,
        content: &str,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
