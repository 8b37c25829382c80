//! Configuration types for the DDNS system
//!
//! This module defines all configuration structures used throughout the crate.

use crate::traits::IpVersion;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default IPv4 lookup endpoint
pub const DEFAULT_IPV4_ENDPOINT: &str = "https://ipv4-test.ludovic-muller.fr";

/// Default IPv6 lookup endpoint
pub const DEFAULT_IPV6_ENDPOINT: &str = "https://ipv6-test.ludovic-muller.fr";

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Zone owning the managed record (e.g., "example.com")
    pub zone: String,

    /// Managed record name (e.g., "home.example.com")
    pub record: String,

    /// IPv4 track
    #[serde(default = "TrackConfig::default_v4")]
    pub ipv4: TrackConfig,

    /// IPv6 track
    #[serde(default = "TrackConfig::default_v6")]
    pub ipv6: TrackConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a configuration for one zone/record pair with default tracks
    pub fn new(
        provider: ProviderConfig,
        zone: impl Into<String>,
        record: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            zone: zone.into(),
            record: record.into(),
            ipv4: TrackConfig::default_v4(),
            ipv6: TrackConfig::default_v6(),
            engine: EngineConfig::default(),
        }
    }

    /// Track configuration for one IP version
    pub fn track(&self, version: IpVersion) -> &TrackConfig {
        match version {
            IpVersion::V4 => &self.ipv4,
            IpVersion::V6 => &self.ipv6,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;

        if self.zone.is_empty() {
            return Err(crate::Error::config("Zone name cannot be empty"));
        }
        if self.record.is_empty() {
            return Err(crate::Error::config("Record name cannot be empty"));
        }

        let zone = self.zone.trim_end_matches('.').to_ascii_lowercase();
        let record = self.record.trim_end_matches('.').to_ascii_lowercase();
        if record != zone && !record.ends_with(&format!(".{}", zone)) {
            return Err(crate::Error::config(format!(
                "Record {} is not inside zone {}",
                self.record, self.zone
            )));
        }

        if !self.ipv4.enabled && !self.ipv6.enabled {
            return Err(crate::Error::config(
                "At least one of IPv4 or IPv6 must be enabled",
            ));
        }

        for version in IpVersion::ALL {
            let track = self.track(version);
            if track.enabled {
                track.validate(version)?;
            }
        }

        self.engine.validate()
    }
}

/// Per-version lookup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// URL returning the public address as a plain-text body
    pub endpoint: String,

    /// Whether this track may be enabled at all
    ///
    /// A track also needs an existing record to be enabled at runtime.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl TrackConfig {
    /// Create an enabled track for an endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            enabled: true,
        }
    }

    /// Enable or disable the track
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn default_v4() -> Self {
        Self::new(DEFAULT_IPV4_ENDPOINT)
    }

    fn default_v6() -> Self {
        Self::new(DEFAULT_IPV6_ENDPOINT)
    }

    fn validate(&self, version: IpVersion) -> Result<(), crate::Error> {
        if self.endpoint.is_empty() {
            return Err(crate::Error::config(format!(
                "{} lookup endpoint cannot be empty",
                version
            )));
        }
        if !self.endpoint.starts_with("https://") && !self.endpoint.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "{} lookup endpoint must use HTTP or HTTPS scheme. Got: {}",
                version, self.endpoint
            )));
        }
        Ok(())
    }
}

fn default_enabled() -> bool {
    true
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Credentials
        auth: CloudflareAuth,
        /// Account ID (optional)
        account_id: Option<String>,
        /// API base URL override (defaults to the public v4 API)
        #[serde(default)]
        api_base: Option<String>,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { auth, .. } => auth.validate(),
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

/// Cloudflare credentials
///
/// The Debug implementation never prints secrets.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum CloudflareAuth {
    /// Global API key plus the account e-mail
    ApiKey {
        /// API key (never logged)
        key: String,
        /// Account e-mail
        email: String,
    },
    /// Scoped API token sent as a bearer token
    ApiToken {
        /// API token (never logged)
        token: String,
    },
}

impl CloudflareAuth {
    fn validate(&self) -> Result<(), crate::Error> {
        match self {
            CloudflareAuth::ApiKey { key, email } => {
                if key.is_empty() {
                    return Err(crate::Error::config("Cloudflare API key cannot be empty"));
                }
                if email.is_empty() {
                    return Err(crate::Error::config(
                        "Cloudflare API email cannot be empty",
                    ));
                }
                Ok(())
            }
            CloudflareAuth::ApiToken { token } => {
                if token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for CloudflareAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudflareAuth::ApiKey { email, .. } => f
                .debug_struct("ApiKey")
                .field("key", &"<REDACTED>")
                .field("email", email)
                .finish(),
            CloudflareAuth::ApiToken { .. } => f
                .debug_struct("ApiToken")
                .field("token", &"<REDACTED>")
                .finish(),
        }
    }
}

/// What the reconciler does when a record update is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFailurePolicy {
    /// Abort the pass and stop the scheduler
    #[default]
    Fatal,
    /// Log the failure and push the same address again on the next pass
    RetryNextPass,
}

impl std::str::FromStr for UpdateFailurePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fatal" => Ok(UpdateFailurePolicy::Fatal),
            "retry" | "retry_next_pass" | "retry-next-pass" => {
                Ok(UpdateFailurePolicy::RetryNextPass)
            }
            other => Err(crate::Error::config(format!(
                "Unknown update failure policy '{}'. Valid: fatal, retry",
                other
            ))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Polling interval applied to both tracks (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// HTTP timeout for address lookups (in seconds)
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: u64,

    /// Reaction to a rejected record update
    #[serde(default)]
    pub on_update_failure: UpdateFailurePolicy,

    /// Capacity of the reconciler event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Polling interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Lookup timeout as a `Duration`
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Polling interval must be > 0"));
        }
        if self.lookup_timeout_secs == 0 {
            return Err(crate::Error::config("Lookup timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            lookup_timeout_secs: default_lookup_timeout_secs(),
            on_update_failure: UpdateFailurePolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_interval_secs() -> u64 {
    120
}

fn default_lookup_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    100
}
