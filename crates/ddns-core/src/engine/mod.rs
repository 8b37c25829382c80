//! Core reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Resolving the current public address of every enabled track
//! - Deciding, per track, whether the record needs new content
//! - Pushing new content via the RecordStore
//! - Keeping the last-known address cache current
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   tick    ┌──────────────┐
//! │  Scheduler  │──────────▶│  Reconciler  │
//! └─────────────┘           └──────────────┘
//!                                   │
//!         ┌─────────────────────────┼─────────────────────────┐
//!         │                         │                         │
//!         ▼                         ▼                         ▼
//! ┌───────────────┐        ┌──────────────┐          ┌─────────────┐
//! │ AddressLookup │        │ AddressCache │          │ RecordStore │
//! │ (resolve)     │        │ (detect)     │          │ (update)    │
//! └───────────────┘        └──────────────┘          └─────────────┘
//! ```
//!
//! ## Pass Flow
//!
//! For each enabled track, IPv4 before IPv6:
//!
//! 1. Resolve the address from the track's endpoint
//! 2. On failure, log and move on to the next track
//! 3. Compare with the cached address, then overwrite the cache
//! 4. If changed (or never seen), call RecordStore::update_record()
//! 5. On update failure, apply the configured [`UpdateFailurePolicy`]

pub mod bootstrap;
pub mod detector;
pub mod scheduler;

pub use bootstrap::{ReconcileContext, Track, Zone, discover};
pub use scheduler::Scheduler;

use crate::config::{EngineConfig, UpdateFailurePolicy};
use crate::error::{Error, Result};
use crate::state::AddressCache;
use crate::traits::{AddressLookup, IpVersion, RecordStore};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// A pass started
    PassStarted { pass: u64 },

    /// A track's address was resolved
    AddressResolved { version: IpVersion, address: String },

    /// A track's address could not be resolved; the track is skipped
    LookupFailed { version: IpVersion, error: String },

    /// The resolved address was already pushed
    UpdateSkipped { version: IpVersion, address: String },

    /// The record now holds the resolved address
    UpdateSucceeded {
        version: IpVersion,
        address: String,
        previous: Option<String>,
    },

    /// Pushing the resolved address failed
    UpdateFailed { version: IpVersion, error: String },

    /// A pass finished
    PassCompleted { pass: u64, updated: usize },

    /// The scheduler stopped
    Stopped { reason: String },
}

/// What happened to one track during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The address could not be resolved
    LookupFailed { error: String },
    /// The address matched the cache; nothing was pushed
    Unchanged { address: String },
    /// The address was pushed
    Updated {
        address: String,
        previous: Option<String>,
    },
    /// The push failed and will be attempted again next pass
    UpdateDeferred { address: String, error: String },
}

/// Summary of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Pass number, starting at 1
    pub pass: u64,
    /// Outcome per enabled track, in processing order
    pub outcomes: Vec<(IpVersion, TrackOutcome)>,
}

impl PassReport {
    /// Outcome for one version, if that track is enabled
    pub fn outcome(&self, version: IpVersion) -> Option<&TrackOutcome> {
        self.outcomes
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, outcome)| outcome)
    }

    /// Number of successful pushes in this pass
    pub fn updated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, TrackOutcome::Updated { .. }))
            .count()
    }
}

/// Core reconciler
///
/// Owns the lookup and store handles, the startup context and the
/// last-known address cache. All work happens on the caller's task: a pass
/// takes `&mut self`, so passes can never overlap.
pub struct Reconciler {
    /// Address lookup for every track
    lookup: Box<dyn AddressLookup>,

    /// Record store for updates
    store: Box<dyn RecordStore>,

    /// Zone and tracks resolved at startup
    context: ReconcileContext,

    /// Last address resolved per endpoint
    cache: AddressCache,

    /// Tracks whose last push failed under `RetryNextPass`
    pending: HashSet<IpVersion>,

    /// Reaction to a failed push
    on_update_failure: UpdateFailurePolicy,

    /// Number of passes started so far
    passes: u64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// reconciliation events
    pub fn new(
        lookup: Box<dyn AddressLookup>,
        store: Box<dyn RecordStore>,
        context: ReconcileContext,
        engine: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        if engine.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }

        let (tx, rx) = mpsc::channel(engine.event_channel_capacity);

        let reconciler = Self {
            lookup,
            store,
            context,
            cache: AddressCache::new(),
            pending: HashSet::new(),
            on_update_failure: engine.on_update_failure,
            passes: 0,
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    pub fn context(&self) -> &ReconcileContext {
        &self.context
    }

    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }

    /// Last address resolved for a track, if the track is enabled and resolved
    pub fn last_known(&self, version: IpVersion) -> Option<&str> {
        let track = self.context.track(version)?;
        self.cache.get(&track.endpoint)
    }

    /// When the current last-known address of a track was first resolved
    pub fn address_since(&self, version: IpVersion) -> Option<DateTime<Utc>> {
        let track = self.context.track(version)?;
        self.cache.entry(&track.endpoint).map(|entry| entry.observed_at)
    }

    /// Number of passes started so far
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Run one pass over every enabled track
    ///
    /// # Returns
    ///
    /// - `Ok(PassReport)`: Every track was processed (lookups may have failed)
    /// - `Err(Error::Update)`: A push failed under `UpdateFailurePolicy::Fatal`;
    ///   tracks after the failing one were not processed
    pub async fn reconcile_all(&mut self) -> Result<PassReport> {
        self.passes += 1;
        let pass = self.passes;
        info!("Checking whether DNS records need an update (pass {})", pass);
        self.emit_event(ReconcileEvent::PassStarted { pass });

        let mut report = PassReport {
            pass,
            outcomes: Vec::with_capacity(self.context.tracks().len()),
        };

        for track in self.context.tracks().to_vec() {
            let outcome = self.reconcile_track(&track).await?;
            report.outcomes.push((track.version, outcome));
        }

        self.emit_event(ReconcileEvent::PassCompleted {
            pass,
            updated: report.updated(),
        });

        Ok(report)
    }

    /// Resolve, detect and maybe push for a single track
    async fn reconcile_track(&mut self, track: &Track) -> Result<TrackOutcome> {
        let version = track.version;

        let address = match self.lookup.lookup(&track.endpoint).await {
            Ok(address) => address,
            Err(e) => {
                warn!("Skipping {} track this pass: {}", version, e);
                self.emit_event(ReconcileEvent::LookupFailed {
                    version,
                    error: e.to_string(),
                });
                return Ok(TrackOutcome::LookupFailed {
                    error: e.to_string(),
                });
            }
        };

        debug!("Resolved {} address {}", version, address);
        self.emit_event(ReconcileEvent::AddressResolved {
            version,
            address: address.clone(),
        });

        let changed = detector::needs_update(self.cache.get(&track.endpoint), &address);
        let held_since = self
            .cache
            .entry(&track.endpoint)
            .map(|entry| entry.observed_at);
        let previous = self.cache.observe(&track.endpoint, &address);
        let retrying = self.pending.contains(&version);

        if !changed && !retrying {
            debug!("{} record already holds {}, skipping update", version, address);
            self.emit_event(ReconcileEvent::UpdateSkipped {
                version,
                address: address.clone(),
            });
            return Ok(TrackOutcome::Unchanged { address });
        }

        if changed
            && let (Some(old), Some(since)) = (&previous, held_since)
        {
            info!(
                "{} address changed from {} (held since {}) to {}",
                version,
                old,
                since.to_rfc3339(),
                address
            );
        }
        info!(
            "Updating {} record using IP {} via {}",
            version,
            address,
            self.store.provider_name()
        );
        match self
            .store
            .update_record(&self.context.zone().id, &track.record_id, &address)
            .await
        {
            Ok(()) => {
                self.pending.remove(&version);
                info!(
                    "Updated {} record {} -> {} (previous: {:?})",
                    version,
                    self.context.record_name(),
                    address,
                    previous
                );
                self.emit_event(ReconcileEvent::UpdateSucceeded {
                    version,
                    address: address.clone(),
                    previous: previous.clone(),
                });
                Ok(TrackOutcome::Updated { address, previous })
            }
            Err(e) => {
                let e = match e {
                    Error::Update { .. } => e,
                    other => Error::update(track.record_id.as_str(), other),
                };
                self.emit_event(ReconcileEvent::UpdateFailed {
                    version,
                    error: e.to_string(),
                });

                match self.on_update_failure {
                    UpdateFailurePolicy::Fatal => {
                        error!("Failed to update {} record: {}", version, e);
                        Err(e)
                    }
                    UpdateFailurePolicy::RetryNextPass => {
                        warn!(
                            "Failed to update {} record, retrying next pass: {}",
                            version, e
                        );
                        self.pending.insert(version);
                        Ok(TrackOutcome::UpdateDeferred {
                            address,
                            error: e.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Emit a reconciliation event
    pub(crate) fn emit_event(&self, event: ReconcileEvent) {
        // A closed channel just means nobody is listening
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
