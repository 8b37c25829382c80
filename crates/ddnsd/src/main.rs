// # ddnsd - DDNS Daemon
//
// This is a THIN integration layer:
// - DO NOT add DNS logic, change detection or retry logic here
// - All reconciliation logic lives in ddns-core
// - Configuration is via environment variables ONLY
//
// The ddnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the address lookup and the Cloudflare record store
// 4. Discovering the records to manage, then running the scheduler
//
// ## Configuration
//
// ### Cloudflare
// - `CF_API_TOKEN`: Scoped API token (preferred)
// - `CF_API_KEY` + `CF_API_EMAIL`: Global API key credentials
// - `CF_ACCOUNT_ID`: Account ID (optional)
// - `CF_ZONE`: Zone name (e.g. example.com)
// - `CF_RECORD`: Record name (e.g. home.example.com)
//
// ### Address lookup
// - `DDNS_IPV4_ENDPOINT` / `DDNS_IPV6_ENDPOINT`: Plain-text "what is my IP" URLs
// - `DDNS_IPV4_ENABLED` / `DDNS_IPV6_ENABLED`: true/false (default true)
// - `DDNS_LOOKUP_TIMEOUT_SECS`: Lookup timeout (default 10)
//
// ### Engine
// - `DDNS_CHECK_INTERVAL_SECS`: Polling interval (default 120)
// - `DDNS_ON_UPDATE_FAILURE`: fatal (default) or retry
// - `DDNS_MODE`: dry-run to log updates instead of sending them
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export CF_API_TOKEN=your_token
// export CF_ZONE=example.com
// export CF_RECORD=home.example.com
// export DDNS_CHECK_INTERVAL_SECS=300
//
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::config::{
    CloudflareAuth, DdnsConfig, DEFAULT_IPV4_ENDPOINT, DEFAULT_IPV6_ENDPOINT, EngineConfig,
    ProviderConfig, TrackConfig, UpdateFailurePolicy,
};
use ddns_core::{ReconcileEvent, Reconciler, Scheduler, discover};
use ddns_ip_http::HttpAddressLookup;
use ddns_provider_cloudflare::CloudflareRecordStore;
use std::env;
use std::future::Future;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (a record update failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    api_token: Option<String>,
    api_key: Option<String>,
    api_email: Option<String>,
    account_id: Option<String>,
    zone: String,
    record: String,
    ipv4_endpoint: String,
    ipv6_endpoint: String,
    ipv4_enabled: bool,
    ipv6_enabled: bool,
    check_interval_secs: u64,
    lookup_timeout_secs: u64,
    on_update_failure: UpdateFailurePolicy,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration through a variable lookup
    ///
    /// Empty values are treated as unset.
    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = EngineConfig::default();

        Ok(Self {
            api_token: var("CF_API_TOKEN"),
            api_key: var("CF_API_KEY"),
            api_email: var("CF_API_EMAIL"),
            account_id: var("CF_ACCOUNT_ID"),
            zone: var("CF_ZONE").unwrap_or_default(),
            record: var("CF_RECORD").unwrap_or_default(),
            ipv4_endpoint: var("DDNS_IPV4_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_IPV4_ENDPOINT.to_string()),
            ipv6_endpoint: var("DDNS_IPV6_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_IPV6_ENDPOINT.to_string()),
            ipv4_enabled: parse_bool("DDNS_IPV4_ENABLED", var("DDNS_IPV4_ENABLED"), true)?,
            ipv6_enabled: parse_bool("DDNS_IPV6_ENABLED", var("DDNS_IPV6_ENABLED"), true)?,
            check_interval_secs: parse_u64(
                "DDNS_CHECK_INTERVAL_SECS",
                var("DDNS_CHECK_INTERVAL_SECS"),
                defaults.interval_secs,
            )?,
            lookup_timeout_secs: parse_u64(
                "DDNS_LOOKUP_TIMEOUT_SECS",
                var("DDNS_LOOKUP_TIMEOUT_SECS"),
                defaults.lookup_timeout_secs,
            )?,
            on_update_failure: match var("DDNS_ON_UPDATE_FAILURE") {
                Some(value) => value
                    .parse()
                    .context("DDNS_ON_UPDATE_FAILURE is not valid")?,
                None => UpdateFailurePolicy::default(),
            },
            dry_run: match var("DDNS_MODE").as_deref() {
                None => false,
                Some("dry-run") => true,
                Some("live") => false,
                Some(other) => anyhow::bail!(
                    "DDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                    other
                ),
            },
            log_level: var("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This performs comprehensive validation including:
    /// - Credential presence
    /// - Domain name format for the zone and the record
    /// - Numeric range validation
    /// - Everything `DdnsConfig::validate` checks
    fn validate(&self) -> Result<()> {
        if self.api_token.is_none() && (self.api_key.is_none() || self.api_email.is_none()) {
            anyhow::bail!(
                "Cloudflare credentials are required. \
                Set CF_API_TOKEN, or both CF_API_KEY and CF_API_EMAIL"
            );
        }

        // Check for obvious placeholder credentials (common mistake)
        for secret in [&self.api_token, &self.api_key].into_iter().flatten() {
            let lower = secret.to_lowercase();
            if lower.contains("your_token") || lower.contains("replace_me") || lower == "token" {
                anyhow::bail!(
                    "Cloudflare credentials appear to be a placeholder. \
                    Use an actual API token or key from the Cloudflare dashboard."
                );
            }
        }

        if self.zone.is_empty() {
            anyhow::bail!("CF_ZONE is required. Set it via: export CF_ZONE=example.com");
        }
        if self.record.is_empty() {
            anyhow::bail!("CF_RECORD is required. Set it via: export CF_RECORD=home.example.com");
        }

        self.validate_domain_name(&self.zone, false)
            .context("CF_ZONE is not a valid domain name")?;
        self.validate_domain_name(&self.record, true)
            .context("CF_RECORD is not a valid domain name")?;

        if !(10..=86400).contains(&self.check_interval_secs) {
            anyhow::bail!(
                "DDNS_CHECK_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {}",
                self.check_interval_secs
            );
        }

        if !(1..=300).contains(&self.lookup_timeout_secs) {
            anyhow::bail!(
                "DDNS_LOOKUP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.lookup_timeout_secs
            );
        }

        for (name, endpoint, enabled) in [
            ("DDNS_IPV4_ENDPOINT", &self.ipv4_endpoint, self.ipv4_enabled),
            ("DDNS_IPV6_ENDPOINT", &self.ipv6_endpoint, self.ipv6_enabled),
        ] {
            if enabled && endpoint.starts_with("http://") {
                eprintln!(
                    "WARNING: {} uses HTTP (not HTTPS). \
                    The answer can be tampered with in transit. Consider using HTTPS.",
                    name
                );
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.to_ddns_config()
            .validate()
            .context("Configuration is inconsistent")?;

        Ok(())
    }

    /// Validate that a string is a valid domain name
    ///
    /// This implements basic DNS domain name validation per RFC 1035, relaxed
    /// the way DNS providers accept record names: labels may contain `_`
    /// (e.g. `_acme-challenge`) and, when `allow_wildcard` is set, the first
    /// label may be `*`. It's not comprehensive but catches common errors.
    fn validate_domain_name(&self, domain: &str, allow_wildcard: bool) -> Result<()> {
        let domain = domain.strip_suffix('.').unwrap_or(domain);

        if domain.is_empty() {
            anyhow::bail!("Domain name cannot be empty");
        }

        // Total length limit (RFC 1035: 253 chars max)
        if domain.len() > 253 {
            anyhow::bail!(
                "Domain name too long: {} chars (max 253). Got: {}",
                domain.len(),
                domain
            );
        }

        for (index, label) in domain.split('.').enumerate() {
            if label.is_empty() {
                anyhow::bail!("Domain name has empty label: '{}'", domain);
            }

            if label == "*" {
                if allow_wildcard && index == 0 {
                    continue;
                }
                anyhow::bail!(
                    "Wildcard label '*' is only allowed as the first label of a record name. Got: {}",
                    domain
                );
            }

            if label.len() > 63 {
                anyhow::bail!(
                    "Domain label too long: {} chars (max 63). Label: '{}'",
                    label.len(),
                    label
                );
            }

            if !label
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
            {
                anyhow::bail!(
                    "Domain label contains invalid characters. Label: '{}'. \
                    Valid: alphanumeric, hyphen and underscore only.",
                    label
                );
            }

            if label.starts_with('-') || label.ends_with('-') {
                anyhow::bail!(
                    "Domain label cannot start or end with hyphen. Label: '{}'",
                    label
                );
            }
        }

        Ok(())
    }

    /// Credentials to hand to the record store; a token wins over a key
    fn auth(&self) -> CloudflareAuth {
        match &self.api_token {
            Some(token) => CloudflareAuth::ApiToken {
                token: token.clone(),
            },
            None => CloudflareAuth::ApiKey {
                key: self.api_key.clone().unwrap_or_default(),
                email: self.api_email.clone().unwrap_or_default(),
            },
        }
    }

    /// Build the library configuration
    fn to_ddns_config(&self) -> DdnsConfig {
        let provider = ProviderConfig::Cloudflare {
            auth: self.auth(),
            account_id: self.account_id.clone(),
            api_base: None,
        };

        // Zone and record names are looked up without the root dot
        let mut config = DdnsConfig::new(
            provider,
            self.zone.trim_end_matches('.'),
            self.record.trim_end_matches('.'),
        );
        config.ipv4 = TrackConfig::new(&self.ipv4_endpoint).with_enabled(self.ipv4_enabled);
        config.ipv6 = TrackConfig::new(&self.ipv6_endpoint).with_enabled(self.ipv6_enabled);
        config.engine = EngineConfig {
            interval_secs: self.check_interval_secs,
            lookup_timeout_secs: self.lookup_timeout_secs,
            on_update_failure: self.on_update_failure,
            ..EngineConfig::default()
        };
        config
    }
}

fn parse_bool(name: &str, value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => anyhow::bail!("{} must be true or false. Got: {}", name, other),
    }
}

fn parse_u64(name: &str, value: Option<String>, default: u64) -> Result<u64> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a whole number of seconds. Got: {}", name, raw)),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");
    info!(
        "Managing {} in zone {} via {} (interval: {}s)",
        config.record,
        config.zone,
        config.to_ddns_config().provider.type_name(),
        config.check_interval_secs
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config)).into()
}

/// Run the daemon until a shutdown signal or a fatal update error
async fn run_daemon(config: Config) -> DdnsExitCode {
    let ddns_config = config.to_ddns_config();

    let store = match CloudflareRecordStore::from_config(&ddns_config.provider, config.dry_run) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to create Cloudflare record store: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };
    let lookup = match HttpAddressLookup::with_timeout(ddns_config.engine.lookup_timeout()) {
        Ok(lookup) => lookup,
        Err(e) => {
            error!("Failed to create address lookup: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    let context = match discover(&store, &ddns_config).await {
        Ok(context) => context,
        Err(e) => {
            error!("Startup failed: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    let (mut reconciler, events) = match Reconciler::new(
        Box::new(lookup),
        Box::new(store),
        context,
        &ddns_config.engine,
    ) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to create reconciler: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("{}", e);
            return DdnsExitCode::RuntimeError;
        }
    };

    let event_logger = tokio::spawn(log_events(events));

    let scheduler = Scheduler::from_config(&ddns_config.engine);
    let result = scheduler.run_until(&mut reconciler, shutdown).await;

    // Closing the channel lets the logger drain the final events and exit
    drop(reconciler);
    if let Err(e) = event_logger.await {
        warn!("Event logger task failed: {}", e);
    }

    match result {
        Ok(()) => {
            info!("Shutting down daemon");
            DdnsExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Daemon error: {}", e);
            DdnsExitCode::RuntimeError
        }
    }
}

/// Forward reconciliation events to the debug log
async fn log_events(mut events: mpsc::Receiver<ReconcileEvent>) {
    while let Some(event) = events.recv().await {
        debug!(?event, "Reconcile event");
    }
}

/// Future that resolves on SIGTERM or SIGINT
///
/// Handlers are installed before the first pass runs, so a signal that
/// arrives mid-pass is observed once the pass is over.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", name);
    })
}

/// Future that resolves on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: SIGINT"),
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<()>().await
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("CF_API_TOKEN", "cf-test-0123456789abcdef"),
            ("CF_ZONE", "example.com"),
            ("CF_RECORD", "home.example.com"),
        ]
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&minimal()).unwrap();

        assert_eq!(config.check_interval_secs, 120);
        assert_eq!(config.lookup_timeout_secs, 10);
        assert_eq!(config.ipv4_endpoint, DEFAULT_IPV4_ENDPOINT);
        assert_eq!(config.ipv6_endpoint, DEFAULT_IPV6_ENDPOINT);
        assert!(config.ipv4_enabled && config.ipv6_enabled);
        assert_eq!(config.on_update_failure, UpdateFailurePolicy::Fatal);
        assert!(!config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn global_key_credentials_are_accepted() {
        let config = config_from(&[
            ("CF_API_KEY", "0123456789abcdef0123"),
            ("CF_API_EMAIL", "ops@example.com"),
            ("CF_ZONE", "example.com"),
            ("CF_RECORD", "example.com"),
        ])
        .unwrap();

        assert!(config.validate().is_ok());
        assert!(matches!(config.auth(), CloudflareAuth::ApiKey { .. }));
    }

    #[test]
    fn token_wins_over_global_key() {
        let mut vars = minimal();
        vars.push(("CF_API_KEY", "0123456789abcdef0123"));
        vars.push(("CF_API_EMAIL", "ops@example.com"));

        let config = config_from(&vars).unwrap();
        assert!(matches!(config.auth(), CloudflareAuth::ApiToken { .. }));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let config = config_from(&[
            ("CF_API_KEY", "0123456789abcdef0123"),
            ("CF_ZONE", "example.com"),
            ("CF_RECORD", "home.example.com"),
        ])
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn record_outside_zone_is_rejected() {
        let mut vars = minimal();
        vars.retain(|(k, _)| *k != "CF_RECORD");
        vars.push(("CF_RECORD", "home.example.org"));

        assert!(config_from(&vars).unwrap().validate().is_err());
    }

    #[test]
    fn interval_range_is_enforced() {
        let mut vars = minimal();
        vars.push(("DDNS_CHECK_INTERVAL_SECS", "5"));
        assert!(config_from(&vars).unwrap().validate().is_err());

        let mut vars = minimal();
        vars.push(("DDNS_CHECK_INTERVAL_SECS", "often"));
        assert!(config_from(&vars).is_err());
    }

    #[test]
    fn both_families_disabled_is_rejected() {
        let mut vars = minimal();
        vars.push(("DDNS_IPV4_ENABLED", "false"));
        vars.push(("DDNS_IPV6_ENABLED", "0"));

        let config = config_from(&vars).unwrap();
        assert!(!config.ipv4_enabled && !config.ipv6_enabled);
        assert!(config.validate().is_err());
    }

    #[test]
    fn mode_and_policy_are_parsed() {
        let mut vars = minimal();
        vars.push(("DDNS_MODE", "dry-run"));
        vars.push(("DDNS_ON_UPDATE_FAILURE", "retry"));

        let config = config_from(&vars).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.on_update_failure, UpdateFailurePolicy::RetryNextPass);

        let mut vars = minimal();
        vars.push(("DDNS_MODE", "yolo"));
        assert!(config_from(&vars).is_err());
    }

    #[test]
    fn ddns_config_carries_engine_settings() {
        let mut vars = minimal();
        vars.push(("DDNS_CHECK_INTERVAL_SECS", "300"));
        vars.push(("DDNS_IPV6_ENABLED", "no"));
        vars.push(("CF_ACCOUNT_ID", "acct-1"));

        let ddns = config_from(&vars).unwrap().to_ddns_config();
        assert_eq!(ddns.engine.interval_secs, 300);
        assert!(ddns.ipv4.enabled);
        assert!(!ddns.ipv6.enabled);
        match ddns.provider {
            ProviderConfig::Cloudflare { account_id, .. } => {
                assert_eq!(account_id.as_deref(), Some("acct-1"))
            }
        }
    }

    #[test]
    fn domain_name_validation() {
        let config = config_from(&minimal()).unwrap();

        assert!(config.validate_domain_name("home.example.com", false).is_ok());
        assert!(config.validate_domain_name("home.example.com.", false).is_ok());
        assert!(config.validate_domain_name("_acme-challenge.example.com", false).is_ok());
        assert!(config.validate_domain_name("bad..example.com", false).is_err());
        assert!(config.validate_domain_name("-bad.example.com", false).is_err());
        assert!(config.validate_domain_name("bad label.example.com", false).is_err());
        assert!(config.validate_domain_name(&"a".repeat(64), false).is_err());
    }

    #[test]
    fn wildcard_only_as_first_record_label() {
        let config = config_from(&minimal()).unwrap();

        assert!(config.validate_domain_name("*.home.example.com", true).is_ok());
        assert!(config.validate_domain_name("*.example.com", false).is_err());
        assert!(config.validate_domain_name("home.*.example.com", true).is_err());
    }

    #[test]
    fn wildcard_record_is_accepted() {
        let mut vars = minimal();
        vars.retain(|(k, _)| *k != "CF_RECORD");
        vars.push(("CF_RECORD", "*.home.example.com"));

        let config = config_from(&vars).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.to_ddns_config().record, "*.home.example.com");
    }

    #[test]
    fn trailing_dots_are_stripped_before_lookup() {
        let config = config_from(&[
            ("CF_API_TOKEN", "cf-test-0123456789abcdef"),
            ("CF_ZONE", "example.com."),
            ("CF_RECORD", "home.example.com."),
        ])
        .unwrap();

        assert!(config.validate().is_ok());
        let ddns = config.to_ddns_config();
        assert_eq!(ddns.zone, "example.com");
        assert_eq!(ddns.record, "home.example.com");
    }

    #[test]
    fn exit_codes_follow_systemd_conventions() {
        assert_eq!(DdnsExitCode::CleanShutdown as u8, 0);
        assert_eq!(DdnsExitCode::ConfigError as u8, 1);
        assert_eq!(DdnsExitCode::RuntimeError as u8, 2);
    }
}
