use thiserror::Error;

/// Why a single feed contributed nothing to an aggregation pass.
///
/// These never escape the per-feed boundary: the aggregator logs them and moves on.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("timed out after {seconds}s fetching {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("feed fetch failed for {url} with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("feed body from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },

    #[error("failed to parse feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

impl FeedError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Network { .. } => "network",
            FeedError::Timeout { .. } => "timeout",
            FeedError::Status { .. } => "status",
            FeedError::TooLarge { .. } => "too_large",
            FeedError::Parse(_) => "parse",
        }
    }
}
