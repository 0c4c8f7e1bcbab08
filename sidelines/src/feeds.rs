use anyhow::Result;
use std::path::PathBuf;

use common::{load_feed_list, validate_feed_list, Config, FeedDescriptor};

/// Supplies the ordered feed list for one aggregation pass.
///
/// An error here is a configuration error and fails the whole request.
#[async_trait::async_trait]
pub trait FeedConfigProvider: Send + Sync {
    async fn feeds(&self) -> Result<Vec<FeedDescriptor>>;

    /// Name used in status output and logs
    fn describe(&self) -> String;
}

/// Feed list embedded in the main configuration, fixed for the process lifetime.
pub struct StaticFeedList {
    feeds: Vec<FeedDescriptor>,
}

impl StaticFeedList {
    pub fn new(feeds: Vec<FeedDescriptor>) -> Result<Self> {
        validate_feed_list(&feeds)?;
        Ok(Self { feeds })
    }
}

#[async_trait::async_trait]
impl FeedConfigProvider for StaticFeedList {
    async fn feeds(&self) -> Result<Vec<FeedDescriptor>> {
        Ok(self.feeds.clone())
    }

    fn describe(&self) -> String {
        format!("inline ({} feeds)", self.feeds.len())
    }
}

/// Feed list kept in its own file and re-read on every pass, so the admin
/// tooling that owns the file does not need to restart the server.
pub struct FileFeedList {
    path: PathBuf,
}

impl FileFeedList {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl FeedConfigProvider for FileFeedList {
    async fn feeds(&self) -> Result<Vec<FeedDescriptor>> {
        load_feed_list(&self.path).await
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Choose the provider from `[feeds]`: a `file` wins over inline `sources`.
pub fn provider_from_config(config: &Config) -> Result<Box<dyn FeedConfigProvider>> {
    match config.feeds.file.as_deref() {
        Some(path) => Ok(Box::new(FileFeedList::new(path))),
        None => Ok(Box::new(StaticFeedList::new(config.feeds.sources.clone())?)),
    }
}
