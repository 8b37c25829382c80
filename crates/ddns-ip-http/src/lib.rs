// # HTTP Address Lookup
//
// This crate provides the HTTP-based address lookup for the DDNS system.
//
// ## Architecture
//
// Each lookup is a single GET against an external "what is my IP" service
// (e.g., ipv4-test.ludovic-muller.fr, api.ipify.org). The service is expected
// to answer with nothing but the address as a plain-text body. Scheduling,
// change detection and retries all live in `ddns-core`.
//
// The body is returned exactly as received. Trimming or parsing it would
// change what the change detector compares and what ends up in the record.
//
// Only a 2xx answer counts as an address. Any other status is a transport
// error: the track is skipped for the pass, so an error page served by the
// lookup service (e.g. a 502 from its proxy) never becomes record content.

use ddns_core::traits::AddressLookup;
use ddns_core::{Error, Result};

use std::time::Duration;

/// Default HTTP timeout for lookups (10 seconds)
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based address lookup
#[derive(Debug, Clone)]
pub struct HttpAddressLookup {
    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressLookup {
    /// Create a lookup with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_LOOKUP_TIMEOUT)
    }

    /// Create a lookup with a custom request timeout
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl AddressLookup for HttpAddressLookup {
    async fn lookup(&self, endpoint: &str) -> Result<String> {
        tracing::debug!("Fetching public address from {}", endpoint);

        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request to {} failed: {}", endpoint, e)))?;

        if !response.status().is_success() {
            return Err(Error::transport(format!(
                "{} answered with HTTP {}",
                endpoint,
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| {
            Error::transport(format!("Failed to read response from {}: {}", endpoint, e))
        })?;

        if body.is_empty() {
            return Err(Error::empty_response(endpoint));
        }

        Ok(body)
    }
}
