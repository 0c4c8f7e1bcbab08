use std::collections::HashMap;
use tracing::debug;
use url::Url;

use crate::aggregate::canonical_source_url;
use crate::model::{Article, FeedMeta, SourceGroup, VideoSection};
use crate::store::{CustomArticle, CustomVideo};

pub const UNTITLED_ARTICLE: &str = "Untitled Article";
pub const UNTITLED_VIDEO: &str = "Untitled Video";

/// Group records by key. Keys keep first-seen order and each group keeps the
/// record order it was given (the store returns most recent first).
pub fn group_by_key<T, F>(records: Vec<T>, key: F) -> Vec<(String, Vec<T>)>
where
    F: Fn(&T) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();

    for record in records {
        let k = key(&record);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![record]));
            }
        }
    }
    groups
}

fn usable_link(link: Option<&str>) -> Option<String> {
    link.map(str::trim)
        .filter(|l| l.starts_with("http"))
        .map(str::to_string)
}

fn title_or(title: Option<&str>, fallback: &str) -> String {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Map a custom article onto the feed it is pinned to. Records without an `http*` link are dropped.
pub fn custom_article(record: CustomArticle, meta: &FeedMeta) -> Option<Article> {
    let link = usable_link(record.link.as_deref())?;
    Some(Article {
        title: title_or(record.title.as_deref(), UNTITLED_ARTICLE),
        link,
        pub_date: record.updated_at.or(record.created_at),
        content_snippet: None,
        feed_title: meta.title.clone(),
        feed_image: meta.image.clone(),
        feed_link: meta.link.clone(),
        updated_at: record.updated_at,
        is_custom: true,
        thumbnail: record.thumbnail,
    })
}

/// Videos have no parent feed; the section name stands in as the feed title.
pub fn custom_video(record: CustomVideo) -> Option<Article> {
    let link = usable_link(record.link.as_deref())?;
    let feed_link = Url::parse(&link)
        .ok()
        .map(|u| u.origin())
        .filter(|o| o.is_tuple())
        .map(|o| o.ascii_serialization())
        .unwrap_or_else(|| link.clone());

    Some(Article {
        title: title_or(record.title.as_deref(), UNTITLED_VIDEO),
        link,
        pub_date: record.updated_at.or(record.created_at),
        content_snippet: None,
        feed_title: record.section_type,
        feed_image: None,
        feed_link,
        updated_at: record.updated_at,
        is_custom: true,
        thumbnail: record.thumbnail,
    })
}

/// Overlay custom articles on the aggregated groups. Custom entries for a source come
/// first, followed by the fetched ones; nothing is deduplicated. Custom articles whose
/// source produced no group in this pass are not emitted.
pub fn merge_articles(groups: Vec<SourceGroup>, custom: Vec<CustomArticle>) -> Vec<SourceGroup> {
    let mut by_source: HashMap<String, Vec<CustomArticle>> =
        group_by_key(custom, |r| canonical_source_url(r.source_url.trim()).to_string())
            .into_iter()
            .collect();

    let merged = groups
        .into_iter()
        .map(|mut group| {
            if let Some(records) = by_source.remove(&group.source.url) {
                let mut articles: Vec<Article> = records
                    .into_iter()
                    .filter_map(|r| custom_article(r, &group.meta))
                    .collect();
                debug!(source = %group.source.url, custom = articles.len(), "merge: custom articles added");
                articles.append(&mut group.articles);
                group.articles = articles;
            }
            group
        })
        .collect();

    for (source, records) in by_source {
        debug!(%source, count = records.len(), "merge: no aggregated group for custom articles");
    }

    merged
}

/// Custom videos grouped by section type, sections in first-seen order.
pub fn merge_videos(custom: Vec<CustomVideo>) -> Vec<VideoSection> {
    group_by_key(custom, |v| v.section_type.trim().to_string())
        .into_iter()
        .map(|(section, records)| VideoSection {
            section,
            videos: records.into_iter().filter_map(custom_video).collect(),
        })
        .collect()
}
