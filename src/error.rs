//! Error types for feed fetching and aggregation.
//!
//! Two layers:
//! - [`FetchError`]: what went wrong talking to a feed source (HTTP, disk, JSON)
//! - [`FeedError`]: which aggregator operation failed, as shown to the reader
//!
//! Every [`FeedError`] is recoverable. The aggregator only mutates state after a
//! fetch fully succeeds, so re-invoking the same operation is always a valid retry.

use thiserror::Error;

/// Failure while retrieving or decoding a single resource.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid feed url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request for {resource} failed: {source}")]
    Transport {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{resource} returned HTTP {status}")]
    Status { resource: String, status: u16 },

    #[error("{resource} does not exist")]
    NotFound { resource: String },

    #[error("could not read {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{resource} is not a valid feed document: {source}")]
    Parse {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid resource name: {0}")]
    InvalidResource(String),
}

impl FetchError {
    /// Errors worth retrying: connection problems, 5xx and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// The resource is absent (HTTP 404 or missing file).
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

/// Caller-visible failure of an aggregator operation.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The primary feed could not be fetched or parsed.
    #[error("news feed unavailable: {0}")]
    FeedUnavailable(#[source] FetchError),

    /// The archive buffer feed could not be fetched or parsed.
    #[error("news archive unavailable: {0}")]
    ArchiveUnavailable(#[source] FetchError),

    /// The requested archive month is missing, unparsable, or not a month key.
    #[error("archive month {month_id} not found: {source}")]
    ArchiveMonthNotFound {
        month_id: String,
        #[source]
        source: FetchError,
    },

    /// The archive month index exists but could not be fetched or parsed.
    #[error("archive index unavailable: {0}")]
    ArchiveIndexUnavailable(#[source] FetchError),
}
