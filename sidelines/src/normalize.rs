use chrono::{DateTime, Utc};
use url::Url;

use common::FeedDescriptor;

use crate::model::{Article, FeedMeta};
use crate::parse::ParsedFeed;

pub const UNTITLED: &str = "Untitled";

fn is_http(link: &str) -> bool {
    link.starts_with("http")
}

/// Resolve the feed-level values shared by every article of one feed.
///
/// Precedence, in order:
/// - link: declared feed link if it is `http*`, then the origin of the first item link,
///   then the URL the feed was fetched from
/// - image: configured image, parsed image, iTunes image, Media RSS image
/// - updated_at: `lastBuildDate`, then the first item carrying a `pubDate`
pub fn resolve_feed_meta(parsed: &ParsedFeed, descriptor: &FeedDescriptor, fetch_url: &str) -> FeedMeta {
    let link = resolve_feed_link(parsed, fetch_url);

    let image = non_empty(descriptor.image.as_deref())
        .or_else(|| non_empty(parsed.image.as_deref()))
        .or_else(|| non_empty(parsed.itunes_image.as_deref()))
        .or_else(|| non_empty(parsed.media_image.as_deref()))
        .map(str::to_string);

    let updated_at = parsed
        .last_build_date
        .or_else(|| parsed.items.iter().find_map(|item| item.pub_date));

    let title = non_empty(descriptor.title.as_deref())
        .or_else(|| non_empty(parsed.title.as_deref()))
        .map(str::to_string)
        .or_else(|| Url::parse(&link).ok().and_then(|u| u.host_str().map(str::to_string)))
        .unwrap_or_else(|| UNTITLED.to_string());

    FeedMeta {
        title,
        image,
        link,
        updated_at,
    }
}

fn resolve_feed_link(parsed: &ParsedFeed, fetch_url: &str) -> String {
    if let Some(link) = parsed.link.as_deref().filter(|l| is_http(l)) {
        return link.to_string();
    }

    let first_item_origin = parsed
        .items
        .first()
        .and_then(|item| item.link.as_deref())
        .and_then(|link| Url::parse(link).ok())
        .map(|u| u.origin())
        .filter(|origin| origin.is_tuple())
        .map(|origin| origin.ascii_serialization());

    first_item_origin.unwrap_or_else(|| fetch_url.to_string())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Map a parsed feed into articles. Items whose link cannot be resolved to an
/// `http*` URL are dropped; item order is kept as the publisher emitted it.
pub fn normalize(parsed: &ParsedFeed, descriptor: &FeedDescriptor, fetch_url: &str) -> (FeedMeta, Vec<Article>) {
    let meta = resolve_feed_meta(parsed, descriptor, fetch_url);

    let articles = parsed
        .items
        .iter()
        .filter_map(|item| {
            let link = match item.link.as_deref().map(str::trim) {
                Some(own) if is_http(own) => own.to_string(),
                _ => meta.link.clone(),
            };
            if link.is_empty() || !is_http(&link) {
                return None;
            }

            Some(Article {
                title: non_empty(item.title.as_deref()).unwrap_or(UNTITLED).to_string(),
                link,
                pub_date: item.pub_date.or(meta.updated_at),
                content_snippet: item.content_snippet.clone(),
                feed_title: meta.title.clone(),
                feed_image: meta.image.clone(),
                feed_link: meta.link.clone(),
                updated_at: meta.updated_at,
                is_custom: false,
                thumbnail: item.media_content.clone(),
            })
        })
        .collect();

    (meta, articles)
}

/// Parse an RFC 3339 or RFC 2822 timestamp, as found in stores and feeds alike.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|d| d.with_timezone(&Utc))
        .ok()
}
