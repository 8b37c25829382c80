//! Startup discovery
//!
//! Resolves the zone and the record identifiers once, before the first pass.
//! The resulting [`ReconcileContext`] is immutable for the life of the
//! process; a track exists in it only if its record exists in the zone.

use crate::config::DdnsConfig;
use crate::error::{Error, Result};
use crate::traits::{IpVersion, RecordId, RecordStore, ZoneId};
use tracing::{debug, info, warn};

/// A resolved provider zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Zone name as configured
    pub name: String,
    /// Provider-side identifier
    pub id: ZoneId,
}

impl Zone {
    pub fn new(name: impl Into<String>, id: ZoneId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// One enabled address-family pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Address family handled by this track
    pub version: IpVersion,
    /// Lookup endpoint URL
    pub endpoint: String,
    /// Record whose content follows the resolved address
    pub record_id: RecordId,
}

impl Track {
    pub fn new(version: IpVersion, endpoint: impl Into<String>, record_id: RecordId) -> Self {
        Self {
            version,
            endpoint: endpoint.into(),
            record_id,
        }
    }
}

/// Everything the reconciler needs that is fixed at startup
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    zone: Zone,
    record_name: String,
    tracks: Vec<Track>,
}

impl ReconcileContext {
    /// Build a context from already-resolved tracks
    ///
    /// Tracks are ordered IPv4 first. Fails with [`Error::NoRecords`] when
    /// `tracks` is empty, and with a configuration error when a version
    /// appears twice.
    pub fn new(zone: Zone, record_name: impl Into<String>, mut tracks: Vec<Track>) -> Result<Self> {
        let record_name = record_name.into();

        if tracks.is_empty() {
            return Err(Error::NoRecords(record_name));
        }

        tracks.sort_by_key(|track| track.version);
        if tracks.windows(2).any(|pair| pair[0].version == pair[1].version) {
            return Err(Error::config("Each IP version can only have one track"));
        }

        Ok(Self {
            zone,
            record_name,
            tracks,
        })
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    /// Enabled tracks in reconciliation order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, version: IpVersion) -> Option<&Track> {
        self.tracks.iter().find(|track| track.version == version)
    }

    pub fn is_enabled(&self, version: IpVersion) -> bool {
        self.track(version).is_some()
    }
}

/// Resolve the zone and discover which tracks have a record to manage
///
/// # Errors
///
/// - [`Error::ZoneNotFound`] (or any other store error) from zone resolution
/// - [`Error::NoRecords`] when neither an A nor an AAAA record exists
///
/// A failed record lookup is logged and treated like a missing record, so
/// one broken record type does not prevent managing the other.
pub async fn discover(store: &dyn RecordStore, config: &DdnsConfig) -> Result<ReconcileContext> {
    let zone_id = store.resolve_zone(&config.zone).await?;
    info!(
        "Resolved zone {} ({}) via {}",
        config.zone,
        zone_id,
        store.provider_name()
    );

    let mut tracks = Vec::new();
    for version in IpVersion::ALL {
        let track_config = config.track(version);
        if !track_config.enabled {
            info!("{} track disabled by configuration", version);
            continue;
        }

        let record_type = version.record_type();
        match store
            .find_record(&zone_id, &config.record, record_type)
            .await
        {
            Ok(Some(record_id)) => {
                debug!("Found {} record {} ({})", record_type, config.record, record_id);
                info!("{} track enabled for {}", version, config.record);
                tracks.push(Track::new(version, track_config.endpoint.clone(), record_id));
            }
            Ok(None) => {
                info!(
                    "No {} record for {}, {} track disabled",
                    record_type, config.record, version
                );
            }
            Err(e) => {
                warn!(
                    "Failed to look up {} record for {}, {} track disabled: {}",
                    record_type, config.record, version, e
                );
            }
        }
    }

    ReconcileContext::new(Zone::new(config.zone.clone(), zone_id), &config.record, tracks)
}
