//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// The address lookup request could not complete
    #[error("Transport error: {0}")]
    Transport(String),

    /// The lookup endpoint answered with an empty body
    #[error("Empty response from {endpoint}")]
    EmptyResponse {
        /// Endpoint that was queried
        endpoint: String,
    },

    /// The provider has no zone with this name
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// Neither an A nor an AAAA record exists for the managed name
    #[error("No A or AAAA record found for {0}")]
    NoRecords(String),

    /// Pushing new content to a record failed
    #[error("Failed to update record {record_id}: {source}")]
    Update {
        /// Provider record identifier
        record_id: String,
        /// Underlying provider error
        #[source]
        source: Box<Error>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an empty-response error for an endpoint
    pub fn empty_response(endpoint: impl Into<String>) -> Self {
        Self::EmptyResponse {
            endpoint: endpoint.into(),
        }
    }

    /// Create a "zone not found" error
    pub fn zone_not_found(zone: impl Into<String>) -> Self {
        Self::ZoneNotFound(zone.into())
    }

    /// Wrap a provider error raised while updating a record
    pub fn update(record_id: impl Into<String>, source: Error) -> Self {
        Self::Update {
            record_id: record_id.into(),
            source: Box::new(source),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
