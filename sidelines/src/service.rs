use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use crate::aggregate::Aggregator;
use crate::feeds::FeedConfigProvider;
use crate::merge::{merge_articles, merge_videos};
use crate::model::{Article, SourceGroup, VideoSection};
use crate::store::ContentStore;

/// One request-scoped aggregation pass wired to its collaborators.
///
/// Only a feed-configuration failure is returned as an error; store failures
/// degrade to natural feed results and per-feed failures to a shorter list.
#[derive(Clone)]
pub struct NewsService {
    feeds: Arc<dyn FeedConfigProvider>,
    aggregator: Aggregator,
    store: Arc<dyn ContentStore>,
}

impl NewsService {
    pub fn new(
        feeds: Arc<dyn FeedConfigProvider>,
        aggregator: Aggregator,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            feeds,
            aggregator,
            store,
        }
    }

    pub fn feeds_description(&self) -> String {
        self.feeds.describe()
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Flat article list in configuration order, without custom content.
    pub async fn news(&self) -> Result<Vec<Article>> {
        let feeds = self.feeds.feeds().await?;
        Ok(self.aggregator.aggregate_flat(&feeds).await)
    }

    /// Per-source groups with custom articles merged in.
    pub async fn sources(&self) -> Result<Vec<SourceGroup>> {
        let feeds = self.feeds.feeds().await?;
        let (groups, custom) = tokio::join!(self.aggregator.aggregate(&feeds), self.store.custom_articles());

        match custom {
            Ok(custom) => Ok(merge_articles(groups, custom)),
            Err(e) => {
                warn!("service: custom articles unavailable, serving feeds only: {:#}", e);
                Ok(groups)
            }
        }
    }

    pub async fn videos(&self) -> Vec<VideoSection> {
        match self.store.custom_videos().await {
            Ok(videos) => merge_videos(videos),
            Err(e) => {
                warn!("service: custom videos unavailable: {:#}", e);
                Vec::new()
            }
        }
    }
}
