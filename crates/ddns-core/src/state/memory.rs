// # Address Cache
//
// In-memory record of the last address resolved for each lookup endpoint.
//
// ## Purpose
//
// The cache is what makes reconciliation idempotent: an address that has
// already been seen is not pushed again. It is owned by the `Reconciler` and
// touched only from its single timeline, so it needs no locking.
//
// ## Crash Behavior
//
// - All state is lost on restart/crash
// - The first pass after a restart treats every address as new and pushes it
//   once, even if the record already holds that value

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Cached observation for one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAddress {
    /// The last address resolved from the endpoint, verbatim
    pub address: String,
    /// When the endpoint first reported this address
    ///
    /// Repeat observations of the same address keep the original time.
    pub observed_at: DateTime<Utc>,
}

/// Last-known address per lookup endpoint
///
/// # Example
///
/// ```rust
/// use ddns_core::state::AddressCache;
///
/// let mut cache = AddressCache::new();
/// assert_eq!(cache.get("https://ipv4.example"), None);
///
/// let previous = cache.observe("https://ipv4.example", "203.0.113.5");
/// assert_eq!(previous, None);
/// assert_eq!(cache.get("https://ipv4.example"), Some("203.0.113.5"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AddressCache {
    inner: HashMap<String, CachedAddress>,
}

impl AddressCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Last address resolved from `endpoint`, if any
    pub fn get(&self, endpoint: &str) -> Option<&str> {
        self.inner.get(endpoint).map(|entry| entry.address.as_str())
    }

    /// Full cache entry for `endpoint`
    pub fn entry(&self, endpoint: &str) -> Option<&CachedAddress> {
        self.inner.get(endpoint)
    }

    /// Record a freshly resolved address, returning the one it replaces
    ///
    /// The overwrite is unconditional: it happens whether or not the address
    /// changed and whether or not a later push succeeds.
    pub fn observe(&mut self, endpoint: &str, address: &str) -> Option<String> {
        let observed_at = match self.inner.get(endpoint) {
            Some(entry) if entry.address == address => entry.observed_at,
            _ => Utc::now(),
        };
        let entry = CachedAddress {
            address: address.to_string(),
            observed_at,
        };
        self.inner
            .insert(endpoint.to_string(), entry)
            .map(|previous| previous.address)
    }

    /// Get the number of cached endpoints
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_overwrites_and_returns_previous() {
        let mut cache = AddressCache::new();
        assert!(cache.is_empty());

        assert_eq!(cache.observe("v4", "203.0.113.5"), None);
        assert_eq!(
            cache.observe("v4", "203.0.113.9").as_deref(),
            Some("203.0.113.5")
        );
        assert_eq!(cache.get("v4"), Some("203.0.113.9"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn endpoints_are_tracked_separately() {
        let mut cache = AddressCache::new();
        cache.observe("v4", "203.0.113.5");
        cache.observe("v6", "2001:db8::1");

        assert_eq!(cache.get("v4"), Some("203.0.113.5"));
        assert_eq!(cache.get("v6"), Some("2001:db8::1"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn repeat_observation_keeps_first_seen_time() {
        let mut cache = AddressCache::new();
        cache.observe("v4", "203.0.113.5");
        let first = cache.entry("v4").unwrap().observed_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.observe("v4", "203.0.113.5");
        assert_eq!(cache.entry("v4").unwrap().observed_at, first);

        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.observe("v4", "203.0.113.9");
        assert!(cache.entry("v4").unwrap().observed_at > first);
    }
}
