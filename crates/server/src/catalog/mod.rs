//! Turning raw provider payloads into canonical record sequences.
//!
//! # Responsibilities
//!
//! - Extract record lists from provider payload envelopes ([`extract`]).
//! - Normalize raw records into [`common::CanonicalRecord`]s ([`normalize`]).
//! - Collapse duplicates and draw bounded random samples ([`dedupe`]).
//!
//! # Module invariants
//!
//! - **Pure.** Nothing here performs I/O, logs, or touches shared state.

pub mod dedupe;
pub mod extract;
pub mod normalize;

pub use dedupe::{dedupe, raw_key, sample};
pub use extract::list_at;
pub use normalize::{normalize, RawKind};

use thiserror::Error;

use crate::provider::ProviderError;
use crate::store::StoreError;

/// Everything that can go wrong in one fetch → normalize → publish cycle.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The provider could not be reached or answered with an error status.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The provider answered, but not in the expected shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The payload was valid but held no records.
    #[error("upstream returned no records")]
    EmptyResult,

    /// Mirroring the dataset to the remote store failed.
    #[error("remote store write failed: {0}")]
    RemoteStoreWriteFailed(String),
}

impl From<ProviderError> for CatalogError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Malformed(m) => CatalogError::MalformedPayload(m),
            other => CatalogError::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(e: StoreError) -> Self {
        CatalogError::RemoteStoreWriteFailed(e.to_string())
    }
}
