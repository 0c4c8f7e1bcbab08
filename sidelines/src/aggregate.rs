use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, info, warn};

use common::{FeedDescriptor, FetchConfig};

use crate::error::FeedError;
use crate::fetch::FeedFetcher;
use crate::model::{Article, SourceGroup};
use crate::normalize::normalize;
use crate::parse::parse_feed;

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Known source URLs that moved. Applied to the returned `source.url` only;
/// anything not listed here is passed through untouched.
pub const SOURCE_ALIASES: &[(&str, &str)] = &[(
    "http://www.espn.com/espn/rss/news",
    "https://www.espn.com/espn/rss/news",
)];

pub fn canonical_source_url(url: &str) -> &str {
    SOURCE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == url)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(url)
}

/// Drives fetch → parse → normalize for every configured feed.
///
/// Feeds run concurrently (bounded) and are isolated from each other: a feed that
/// fails at any stage is logged and left out, the rest are returned in configuration order.
#[derive(Clone)]
pub struct Aggregator {
    fetcher: FeedFetcher,
    max_concurrency: usize,
}

impl Aggregator {
    pub fn new(fetcher: FeedFetcher, max_concurrency: usize) -> Self {
        Self {
            fetcher,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn from_config(config: Option<&FetchConfig>) -> anyhow::Result<Self> {
        let fetcher = FeedFetcher::from_config(config)?;
        let max_concurrency = config
            .and_then(|c| c.max_concurrency)
            .unwrap_or(DEFAULT_MAX_CONCURRENCY);
        Ok(Self::new(fetcher, max_concurrency))
    }

    pub async fn aggregate(&self, feeds: &[FeedDescriptor]) -> Vec<SourceGroup> {
        let started = Instant::now();

        // `buffered` keeps output in input order while running units concurrently.
        // Each unit owns its descriptor and a handle to the aggregator.
        let groups: Vec<SourceGroup> = stream::iter(feeds.to_vec())
            .map(|descriptor| {
                let this = self.clone();
                async move { this.process_feed(&descriptor).await }
            })
            .buffered(self.max_concurrency)
            .filter_map(|group| async move { group })
            .collect()
            .await;

        info!(
            configured = feeds.len(),
            loaded = groups.len(),
            articles = groups.iter().map(|g| g.articles.len()).sum::<usize>(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregate: pass complete"
        );
        groups
    }

    /// All articles of one pass, concatenated in configuration order.
    pub async fn aggregate_flat(&self, feeds: &[FeedDescriptor]) -> Vec<Article> {
        self.aggregate(feeds)
            .await
            .into_iter()
            .flat_map(|group| group.articles)
            .collect()
    }

    async fn process_feed(&self, descriptor: &FeedDescriptor) -> Option<SourceGroup> {
        match self.load_feed(descriptor).await {
            Ok(group) => {
                debug!(url = %descriptor.url, articles = group.articles.len(), "aggregate: feed loaded");
                Some(group)
            }
            Err(e) => {
                warn!(url = %descriptor.url, kind = e.kind(), "aggregate: skipping feed: {}", e);
                None
            }
        }
    }

    /// One feed end to end. Either the whole feed normalizes or it contributes nothing.
    pub async fn load_feed(&self, descriptor: &FeedDescriptor) -> Result<SourceGroup, FeedError> {
        let url = descriptor.url.trim();
        let body = self.fetcher.fetch(url).await?;
        let parsed = parse_feed(&body)?;
        let (meta, articles) = normalize(&parsed, descriptor, url);

        let mut source = descriptor.clone();
        source.url = canonical_source_url(url).to_string();

        Ok(SourceGroup {
            source,
            meta,
            articles,
        })
    }
}
