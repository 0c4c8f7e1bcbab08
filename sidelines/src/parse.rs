use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::FeedError;

/// Feed-level metadata plus items, in the order the publisher emitted them.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    /// Site link declared by the feed itself (RSS `<link>`, Atom `rel="alternate"`).
    pub link: Option<String>,
    /// RSS `<image><url>` or Atom `<logo>`.
    pub image: Option<String>,
    pub itunes_image: Option<String>,
    pub media_image: Option<String>,
    pub last_build_date: Option<DateTime<Utc>>,
    pub items: Vec<RawFeedItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    pub content_snippet: Option<String>,
    pub media_content: Option<String>,
}

/// Parse an RSS / Atom / JSON Feed payload.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, FeedError> {
    let feed = parser::parse(bytes)?;
    let channel = scan_channel(bytes);

    let items = feed.entries.iter().map(raw_item).collect();

    Ok(ParsedFeed {
        title: feed.title.map(|t| t.content.trim().to_string()).filter(|t| !t.is_empty()),
        link: channel.link.or_else(|| site_link(&feed.links)),
        image: feed.logo.map(|i| i.uri).filter(|u| !u.trim().is_empty()),
        itunes_image: channel.itunes,
        media_image: channel.media,
        last_build_date: feed.updated,
        items,
    })
}

fn raw_item(entry: &Entry) -> RawFeedItem {
    RawFeedItem {
        title: entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty()),
        link: entry_link(&entry.links),
        pub_date: entry.published.or(entry.updated),
        content_snippet: entry
            .summary
            .as_ref()
            .map(|s| s.content.as_str())
            .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()))
            .map(snippet)
            .filter(|s| !s.is_empty()),
        media_content: entry_thumbnail(entry),
    }
}

/// The feed's own site link. `rel="self"` points back at the feed document and is skipped.
fn site_link(links: &[Link]) -> Option<String> {
    entry_link(links).or_else(|| {
        links
            .iter()
            .filter(|l| !l.rel.as_deref().map_or(false, |r| r.eq_ignore_ascii_case("self")))
            .map(|l| l.href.trim())
            .find(|href| !href.is_empty())
            .map(str::to_string)
    })
}

fn entry_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .filter(|l| {
            l.rel
                .as_deref()
                .map_or(true, |r| r.is_empty() || r.eq_ignore_ascii_case("alternate"))
        })
        .map(|l| l.href.trim())
        .find(|href| !href.is_empty())
        .map(str::to_string)
}

/// First media thumbnail, else first media content URL.
fn entry_thumbnail(entry: &Entry) -> Option<String> {
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.trim())
        .find(|uri| !uri.is_empty())
        .map(str::to_string);

    thumbnail.or_else(|| {
        entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
    })
}

/// Plain-text snippet from an HTML-ish summary.
fn snippet(html: &str) -> String {
    let text = if html.contains('<') {
        match html2text::from_read(html.as_bytes(), 10_000) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("parse: html2text failed on summary: {}", e);
                html.to_string()
            }
        }
    } else {
        html.to_string()
    };

    text.lines()
        .filter(|line| !is_footnote(line))
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// html2text appends link references as "[1]: https://..."
fn is_footnote(line: &str) -> bool {
    let line = line.trim_start();
    line.strip_prefix('[')
        .and_then(|rest| rest.split_once("]:"))
        .map_or(false, |(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

#[derive(Debug, Default)]
struct ChannelScan {
    link: Option<String>,
    itunes: Option<String>,
    media: Option<String>,
}

/// feed-rs normalizes link hrefs through `url` (a bare origin gains a trailing `/`) and does
/// not surface channel-level iTunes / Media RSS images. This shallow pass reads those as the
/// publisher wrote them, ignoring everything inside `<item>` / `<entry>` and RSS `<image>`.
/// Best effort: a reader error just ends the scan.
fn scan_channel(bytes: &[u8]) -> ChannelScan {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut scan = ChannelScan::default();
    let mut nested_depth = 0usize;
    let mut in_link = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if is_nested(&e) {
                    nested_depth += 1;
                } else if nested_depth == 0 {
                    in_link = e.name().as_ref() == b"link" && scan.link.is_none();
                    record_channel_element(&e, &mut scan);
                }
            }
            Ok(Event::Empty(e)) => {
                if nested_depth == 0 {
                    record_channel_element(&e, &mut scan);
                }
            }
            Ok(Event::Text(t)) if in_link => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim();
                    if !text.is_empty() {
                        scan.link = Some(text.to_string());
                    }
                }
            }
            Ok(Event::CData(c)) if in_link => {
                let text = String::from_utf8_lossy(&c).trim().to_string();
                if !text.is_empty() {
                    scan.link = Some(text);
                }
            }
            Ok(Event::End(e)) => {
                in_link = false;
                if matches!(e.name().as_ref(), b"item" | b"entry" | b"image")
                    || matches!(e.local_name().as_ref(), b"item" | b"entry")
                {
                    nested_depth = nested_depth.saturating_sub(1);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    scan
}

// `<image>` only counts unprefixed, so `itunes:image` stays a channel element.
fn is_nested(e: &BytesStart) -> bool {
    matches!(e.name().as_ref(), b"item" | b"entry" | b"image")
        || matches!(e.local_name().as_ref(), b"item" | b"entry")
}

fn record_channel_element(e: &BytesStart, scan: &mut ChannelScan) {
    match e.name().as_ref() {
        // Atom: `<link href=".."/>` with no rel or rel="alternate". RSS `atom:link` is prefixed.
        b"link" if scan.link.is_none() => {
            let rel = attr(e, b"rel");
            if rel.as_deref().map_or(true, |r| r.eq_ignore_ascii_case("alternate")) {
                scan.link = attr(e, b"href");
            }
        }
        b"itunes:image" if scan.itunes.is_none() => scan.itunes = attr(e, b"href"),
        b"media:content" | b"media:thumbnail" if scan.media.is_none() => {
            scan.media = attr(e, b"url")
        }
        _ => {}
    }
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}
