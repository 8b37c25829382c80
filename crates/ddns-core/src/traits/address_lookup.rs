// # Address Lookup Trait
//
// Defines the interface for discovering the host's current public address
// by asking an external "what is my IP" endpoint.
//
// ## Implementations
//
// - HTTP GET: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::AddressLookup;
//
// #[tokio::main]
// async fn main() -> ddns_core::Result<()> {
//     let lookup = /* AddressLookup implementation */;
//
//     let address = lookup.lookup("https://ipv4-test.ludovic-muller.fr").await?;
//     println!("public address: {}", address);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IP version (v4 or v6)
///
/// Each version is an independent track with its own endpoint and record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Both versions, in reconciliation order
    pub const ALL: [IpVersion; 2] = [IpVersion::V4, IpVersion::V6];

    /// The address record type carrying this version
    pub fn record_type(self) -> super::RecordType {
        match self {
            IpVersion::V4 => super::RecordType::A,
            IpVersion::V6 => super::RecordType::Aaaa,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("IPv4"),
            IpVersion::V6 => f.write_str("IPv6"),
        }
    }
}

/// Trait for address lookup implementations
///
/// A lookup performs one network fetch against the given endpoint and
/// returns the response body as the address string.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform one HTTP(S) request to the endpoint it is given
/// - ✅ Return success or failure (the reconciler decides what happens next)
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (a failed track is simply retried next pass)
/// - ❌ Cache addresses (owned by `Reconciler`)
/// - ❌ Decide whether an update is needed (owned by the change detector)
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Fetch the current public address from `endpoint`
    ///
    /// The body is returned verbatim. No format validation is performed, so a
    /// body of `"203.0.113.5\n"` and one of `"203.0.113.5"` are different
    /// addresses as far as change detection is concerned.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The non-empty response body
    /// - `Err(Error::Transport)`: The request could not complete
    /// - `Err(Error::EmptyResponse)`: The request completed with an empty body
    async fn lookup(&self, endpoint: &str) -> Result<String, crate::Error>;
}
