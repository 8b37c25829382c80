// # Cloudflare Record Store
//
// This crate provides the Cloudflare implementation of `RecordStore`.
//
// ## Behaviour
//
// - ✅ One HTTP request per trait call
// - ✅ Full error propagation (the scheduler decides whether to stop)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - ✅ Dry-run mode for safe testing
// - ✅ Global API key (X-Auth-Key / X-Auth-Email) and scoped API token auth
// - ❌ NO record creation or deletion
// - ❌ NO retry logic, backoff or caching
//
// ## Security Requirements
//
// - Credentials NEVER appear in logs or Debug output
// - Credentials MUST be provided via environment variables only
// - Construction MUST fail fast if credentials are empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddns_core::config::{CloudflareAuth, ProviderConfig};
use ddns_core::traits::{RecordId, RecordStore, RecordType, ZoneId};
use ddns_core::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Cloudflare record store
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the store will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended PATCH payload
/// - **NOT** actually modify DNS records
pub struct CloudflareRecordStore {
    /// Credentials
    /// ⚠️ NEVER log these
    auth: CloudflareAuth,

    /// Account ID (optional, narrows the zone lookup)
    account_id: Option<String>,

    /// API base URL
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PATCH updates
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareRecordStore")
            .field("auth", &self.auth)
            .field("account_id", &self.account_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareRecordStore {
    /// Create a new Cloudflare record store
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the credentials are empty or the
    /// HTTP client cannot be built.
    pub fn new(auth: CloudflareAuth, account_id: Option<String>, dry_run: bool) -> Result<Self> {
        match &auth {
            CloudflareAuth::ApiKey { key, email } if key.is_empty() || email.is_empty() => {
                return Err(Error::config(
                    "Cloudflare API key and email cannot be empty",
                ));
            }
            CloudflareAuth::ApiToken { token } if token.is_empty() => {
                return Err(Error::config("Cloudflare API token cannot be empty"));
            }
            _ => {}
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            auth,
            account_id,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a store that applies updates
    pub fn new_live(auth: CloudflareAuth, account_id: Option<String>) -> Result<Self> {
        Self::new(auth, account_id, false)
    }

    /// Create a store that only logs the updates it would apply
    pub fn new_dry_run(auth: CloudflareAuth, account_id: Option<String>) -> Result<Self> {
        Self::new(auth, account_id, true)
    }

    /// Create a store from provider configuration
    pub fn from_config(config: &ProviderConfig, dry_run: bool) -> Result<Self> {
        match config {
            ProviderConfig::Cloudflare {
                auth,
                account_id,
                api_base,
            } => {
                if dry_run {
                    tracing::warn!(
                        "Cloudflare record store running in DRY-RUN mode - no changes will be made"
                    );
                }

                let store = Self::new(auth.clone(), account_id.clone(), dry_run)?;
                Ok(match api_base {
                    Some(base) => store.with_api_base(base.clone()),
                    None => store,
                })
            }
        }
    }

    /// Point the store at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Attach credentials to a request
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            CloudflareAuth::ApiKey { key, email } => request
                .header("X-Auth-Key", key)
                .header("X-Auth-Email", email),
            CloudflareAuth::ApiToken { token } => request.bearer_auth(token),
        }
    }

    /// Send a request and return the decoded JSON envelope
    ///
    /// Non-2xx statuses and `"success": false` envelopes become errors.
    async fn send(&self, request: reqwest::RequestBuilder, action: &str) -> Result<Value> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text, action));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to parse response: {}", e)))?;

        if json["success"].as_bool() == Some(false) {
            return Err(Error::provider(
                PROVIDER,
                format!("{} failed: {}", action, api_errors(&json)),
            ));
        }

        Ok(json)
    }

    /// Send an update, or log it in dry-run mode
    async fn patch_content(&self, zone: &ZoneId, record: &RecordId, content: &str) -> Result<()> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.api_base, zone, record
        );
        let payload = serde_json::json!({ "content": content });

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PATCH request to {} with payload: {}",
                url,
                payload
            );
            return Ok(());
        }

        self.send(self.client.patch(&url).json(&payload), "Record update")
            .await?;
        Ok(())
    }
}

/// Map an unsuccessful HTTP status to an error
fn status_error(status: reqwest::StatusCode, body: &str, action: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::provider(
            PROVIDER,
            format!(
                "Authentication failed: Invalid credentials or insufficient permissions. Status: {}",
                status
            ),
        ),
        404 => Error::provider(PROVIDER, format!("{} failed: not found. Status: {}", action, status)),
        409 => Error::provider(
            PROVIDER,
            format!("Conflict: Record is being updated by another process. Status: {}", status),
        ),
        429 => Error::provider(
            PROVIDER,
            format!("Rate limit exceeded. Please retry later. Status: {}", status),
        ),
        500..=599 => Error::provider(
            PROVIDER,
            format!("Cloudflare server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider(PROVIDER, format!("{} failed: {} - {}", action, status, body)),
    }
}

/// Join the messages of a v4 error envelope
fn api_errors(json: &Value) -> String {
    let messages: Vec<String> = json["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .map(|e| match (e["code"].as_i64(), e["message"].as_str()) {
                    (Some(code), Some(message)) => format!("{} ({})", message, code),
                    (None, Some(message)) => message.to_string(),
                    _ => e.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        "unknown error".to_string()
    } else {
        messages.join("; ")
    }
}

/// The `id` of the first element of the `result` array, if any
fn first_result_id(json: &Value) -> Result<Option<String>> {
    let results = json["result"].as_array().ok_or_else(|| {
        Error::provider(PROVIDER, "Invalid response format: result is not an array")
    })?;

    match results.first() {
        None => Ok(None),
        Some(item) => item["id"]
            .as_str()
            .map(|id| Some(id.to_string()))
            .ok_or_else(|| Error::provider(PROVIDER, "Invalid response format: id is not a string")),
    }
}

#[async_trait]
impl RecordStore for CloudflareRecordStore {
    /// Resolve a zone name to its identifier
    ///
    /// ```http
    /// GET /zones?name=example.com[&account.id=...]
    /// ```
    async fn resolve_zone(&self, zone_name: &str) -> Result<ZoneId> {
        tracing::debug!("Looking up zone ID for: {}", zone_name);

        let url = format!("{}/zones", self.api_base);
        let mut query = vec![("name", zone_name)];
        if let Some(account_id) = &self.account_id {
            query.push(("account.id", account_id.as_str()));
        }

        let json = self
            .send(self.client.get(&url).query(&query), "Zone lookup")
            .await?;

        let zone_id = first_result_id(&json)?.ok_or_else(|| Error::zone_not_found(zone_name))?;

        tracing::debug!("Found zone ID: {}", zone_id);
        Ok(ZoneId::new(zone_id))
    }

    /// Find the record ID for a name and type
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.com&type=A
    /// ```
    async fn find_record(
        &self,
        zone: &ZoneId,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordId>> {
        tracing::debug!("Looking up record ID: {} (type: {})", name, record_type);

        let url = format!("{}/zones/{}/dns_records", self.api_base, zone);
        let query = [("name", name), ("type", record_type.as_str())];

        let json = self
            .send(self.client.get(&url).query(&query), "Record lookup")
            .await?;

        let record_id = first_result_id(&json)?;
        match &record_id {
            Some(id) => tracing::debug!("Found record ID: {}", id),
            None => tracing::debug!("No {} record named {}", record_type, name),
        }

        Ok(record_id.map(RecordId::new))
    }

    /// Replace the record content
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// { "content": "203.0.113.5" }
    /// ```
    async fn update_record(&self, zone: &ZoneId, record: &RecordId, content: &str) -> Result<()> {
        tracing::info!(
            "Updating Cloudflare DNS record {} -> {} [mode: {}]",
            record,
            content,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        self.patch_content(zone, record, content)
            .await
            .map_err(|e| Error::update(record.as_str(), e))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
