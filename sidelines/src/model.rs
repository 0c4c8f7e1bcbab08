use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::FeedDescriptor;

/// The shape every source is mapped into before it reaches the presentation layer.
///
/// `link` always starts with `http`; anything that cannot satisfy that is dropped upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub link: String,
    pub pub_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_snippet: Option<String>,
    pub feed_title: String,
    pub feed_image: Option<String>,
    pub feed_link: String,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Feed-level values resolved once per feed and stamped onto each of its articles.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedMeta {
    pub title: String,
    pub image: Option<String>,
    pub link: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One configured source and its articles, keyed by `source.url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceGroup {
    pub source: FeedDescriptor,
    #[serde(skip)]
    pub meta: FeedMeta,
    pub articles: Vec<Article>,
}

/// Custom videos for one section type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSection {
    pub section: String,
    pub videos: Vec<Article>,
}

/// Body of the flat news endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewsResponse {
    pub articles: Vec<Article>,
}

/// Body returned when a whole request fails. Never carries internal detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
