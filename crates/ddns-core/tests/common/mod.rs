//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles are cheap to clone; clones share state, so a test keeps one
//! handle for assertions and gives another to the reconciler.

#![allow(dead_code)]

use ddns_core::config::{
    CloudflareAuth, DdnsConfig, EngineConfig, ProviderConfig, TrackConfig, UpdateFailurePolicy,
};
use ddns_core::engine::{ReconcileContext, ReconcileEvent, Reconciler, Track, Zone};
use ddns_core::error::{Error, Result};
use ddns_core::traits::{AddressLookup, IpVersion, RecordId, RecordStore, RecordType, ZoneId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const ZONE: &str = "example.com";
pub const ZONE_ID: &str = "zone-123";
pub const RECORD: &str = "home.example.com";
pub const V4_ENDPOINT: &str = "https://ipv4.lookup.test";
pub const V6_ENDPOINT: &str = "https://ipv6.lookup.test";
pub const V4_RECORD_ID: &str = "record-a";
pub const V6_RECORD_ID: &str = "record-aaaa";

#[derive(Debug, Clone)]
enum Scripted {
    Address(String),
    Empty,
    Unreachable,
}

/// An AddressLookup whose answer per endpoint is set by the test
#[derive(Clone, Default)]
pub struct ScriptedLookup {
    responses: Arc<Mutex<HashMap<String, Scripted>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `address` for `endpoint` from now on
    pub fn respond(&self, endpoint: &str, address: &str) {
        self.set(endpoint, Scripted::Address(address.to_string()));
    }

    /// Answer with an empty body for `endpoint` from now on
    pub fn respond_empty(&self, endpoint: &str) {
        self.set(endpoint, Scripted::Empty);
    }

    /// Fail with a transport error for `endpoint` from now on
    pub fn fail(&self, endpoint: &str) {
        self.set(endpoint, Scripted::Unreachable);
    }

    /// Endpoints looked up so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn set(&self, endpoint: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), response);
    }
}

#[async_trait::async_trait]
impl AddressLookup for ScriptedLookup {
    async fn lookup(&self, endpoint: &str) -> Result<String> {
        self.calls.lock().unwrap().push(endpoint.to_string());

        let response = self.responses.lock().unwrap().get(endpoint).cloned();
        match response {
            Some(Scripted::Address(address)) => Ok(address),
            Some(Scripted::Empty) => Err(Error::empty_response(endpoint)),
            Some(Scripted::Unreachable) | None => {
                Err(Error::transport(format!("connection refused: {}", endpoint)))
            }
        }
    }
}

/// One recorded update_record() call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpdate {
    pub zone: String,
    pub record: String,
    pub content: String,
}

/// A RecordStore backed by in-memory maps that records every update
#[derive(Clone, Default)]
pub struct MockRecordStore {
    zones: Arc<Mutex<HashMap<String, String>>>,
    records: Arc<Mutex<HashMap<(String, RecordType), String>>>,
    broken_types: Arc<Mutex<HashSet<RecordType>>>,
    updates: Arc<Mutex<Vec<RecordedUpdate>>>,
    fail_updates: Arc<AtomicBool>,
    find_call_count: Arc<AtomicUsize>,
}

impl MockRecordStore {
    /// A store with the test zone and no records
    pub fn new() -> Self {
        let store = Self::default();
        store
            .zones
            .lock()
            .unwrap()
            .insert(ZONE.to_string(), ZONE_ID.to_string());
        store
    }

    /// A store with both an A and an AAAA record for the test name
    pub fn dual_stack() -> Self {
        Self::new()
            .with_record(RECORD, RecordType::A, V4_RECORD_ID)
            .with_record(RECORD, RecordType::Aaaa, V6_RECORD_ID)
    }

    pub fn with_record(self, name: &str, record_type: RecordType, id: &str) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert((name.to_string(), record_type), id.to_string());
        self
    }

    /// Make find_record() fail for a record type
    pub fn with_broken_lookup(self, record_type: RecordType) -> Self {
        self.broken_types.lock().unwrap().insert(record_type);
        self
    }

    /// Make every update_record() call fail (or succeed again)
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// All update_record() calls so far, including failed ones
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn update_call_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    /// Contents pushed to one record, in order
    pub fn contents_for(&self, record_id: &str) -> Vec<String> {
        self.updates()
            .into_iter()
            .filter(|update| update.record == record_id)
            .map(|update| update.content)
            .collect()
    }

    pub fn find_call_count(&self) -> usize {
        self.find_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecordStore for MockRecordStore {
    async fn resolve_zone(&self, zone_name: &str) -> Result<ZoneId> {
        self.zones
            .lock()
            .unwrap()
            .get(zone_name)
            .map(ZoneId::new)
            .ok_or_else(|| Error::zone_not_found(zone_name))
    }

    async fn find_record(
        &self,
        _zone: &ZoneId,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordId>> {
        self.find_call_count.fetch_add(1, Ordering::SeqCst);

        if self.broken_types.lock().unwrap().contains(&record_type) {
            return Err(Error::provider("mock", "record listing unavailable"));
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(name.to_string(), record_type))
            .map(RecordId::new))
    }

    async fn update_record(&self, zone: &ZoneId, record: &RecordId, content: &str) -> Result<()> {
        self.updates.lock().unwrap().push(RecordedUpdate {
            zone: zone.to_string(),
            record: record.to_string(),
            content: content.to_string(),
        });

        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::update(
                record.as_str(),
                Error::provider("mock", "403 Forbidden"),
            ));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to create a minimal DdnsConfig pointing at the test endpoints
pub fn minimal_config() -> DdnsConfig {
    let mut config = DdnsConfig::new(
        ProviderConfig::Cloudflare {
            auth: CloudflareAuth::ApiToken {
                token: "test-token".to_string(),
            },
            account_id: None,
            api_base: None,
        },
        ZONE,
        RECORD,
    );
    config.ipv4 = TrackConfig::new(V4_ENDPOINT);
    config.ipv6 = TrackConfig::new(V6_ENDPOINT);
    config
}

/// Context with the requested tracks enabled
pub fn context(versions: &[IpVersion]) -> ReconcileContext {
    let tracks = versions
        .iter()
        .map(|version| match version {
            IpVersion::V4 => Track::new(IpVersion::V4, V4_ENDPOINT, RecordId::new(V4_RECORD_ID)),
            IpVersion::V6 => Track::new(IpVersion::V6, V6_ENDPOINT, RecordId::new(V6_RECORD_ID)),
        })
        .collect();

    ReconcileContext::new(Zone::new(ZONE, ZoneId::new(ZONE_ID)), RECORD, tracks)
        .expect("at least one track")
}

/// Build a reconciler over shared doubles
pub fn reconciler(
    lookup: &ScriptedLookup,
    store: &MockRecordStore,
    versions: &[IpVersion],
    policy: UpdateFailurePolicy,
) -> (Reconciler, mpsc::Receiver<ReconcileEvent>) {
    let engine = EngineConfig {
        on_update_failure: policy,
        ..EngineConfig::default()
    };

    Reconciler::new(
        Box::new(lookup.clone()),
        Box::new(store.clone()),
        context(versions),
        &engine,
    )
    .expect("reconciler construction succeeds")
}

/// Everything currently buffered on the event channel
pub fn drain_events(rx: &mut mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
