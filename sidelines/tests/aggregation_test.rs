use common::FeedDescriptor;
use sidelines::aggregate::Aggregator;
use sidelines::fetch::{FeedFetcher, DEFAULT_USER_AGENT};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

fn aggregator(timeout_secs: u64) -> Aggregator {
    let fetcher = FeedFetcher::new(timeout_secs, timeout_secs, DEFAULT_USER_AGENT).expect("fetcher");
    Aggregator::new(fetcher, 4)
}

fn rss(title: &str, site: &str, items: &[(&str, Option<&str>, Option<&str>)]) -> String {
    let items: String = items
        .iter()
        .map(|(t, link, date)| {
            let link = link.map(|l| format!("<link>{}</link>", l)).unwrap_or_default();
            let date = date.map(|d| format!("<pubDate>{}</pubDate>", d)).unwrap_or_default();
            format!("<item><title>{}</title>{}{}</item>", t, link, date)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>{}</title><link>{}</link>{}</channel></rss>"#,
        title, site, items
    )
}

/// Accepts connections and never answers.
async fn hanging_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}/rss", addr)
}

#[tokio::test]
async fn item_without_link_routes_to_feed_link() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/rss")
        .with_status(200)
        .with_header("content-type", "application/rss+xml")
        .with_body(rss("A", "https://a.test", &[("Linkless", None, None)]))
        .create_async()
        .await;

    let feeds = vec![FeedDescriptor::new(format!("{}/rss", server.url()))];
    let groups = aggregator(5).aggregate(&feeds).await;

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].articles.len(), 1);
    let article = &groups[0].articles[0];
    assert_eq!(article.link, "https://a.test");
    assert_eq!(article.feed_link, "https://a.test");
    assert_eq!(article.title, "Linkless");
}

#[tokio::test]
async fn failing_feed_is_skipped_and_order_is_kept() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/first")
        .with_status(200)
        .with_body(rss("First", "https://first.test", &[("F1", Some("https://first.test/1"), None)]))
        .create_async()
        .await;
    server
        .mock("GET", "/broken")
        .with_status(500)
        .create_async()
        .await;
    server
        .mock("GET", "/garbage")
        .with_status(200)
        .with_body("<html>definitely not a feed")
        .create_async()
        .await;
    server
        .mock("GET", "/last")
        .with_status(200)
        .with_body(rss(
            "Last",
            "https://last.test",
            &[("L1", Some("https://last.test/1"), None), ("L2", Some("https://last.test/2"), None)],
        ))
        .create_async()
        .await;

    let feeds: Vec<FeedDescriptor> = ["/first", "/broken", "/garbage", "/last"]
        .iter()
        .map(|p| FeedDescriptor::new(format!("{}{}", server.url(), p)))
        .collect();
    let groups = aggregator(5).aggregate(&feeds).await;

    assert_eq!(groups.len(), 2);
    assert!(groups[0].source.url.ends_with("/first"));
    assert!(groups[1].source.url.ends_with("/last"));
    assert_eq!(groups[1].articles.len(), 2);
    assert_eq!(groups[1].articles[0].title, "L1");
}

#[tokio::test]
async fn second_feed_500_leaves_first_group_only() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/ok")
        .with_status(200)
        .with_body(rss("Ok", "https://ok.test", &[("One", Some("https://ok.test/1"), None)]))
        .create_async()
        .await;
    server.mock("GET", "/down").with_status(500).create_async().await;

    let feeds = vec![
        FeedDescriptor::new(format!("{}/ok", server.url())),
        FeedDescriptor::new(format!("{}/down", server.url())),
    ];
    let groups = aggregator(5).aggregate(&feeds).await;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].articles[0].title, "One");
}

#[tokio::test]
async fn slow_feed_times_out_without_stalling_others() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/fast")
        .with_status(200)
        .with_body(rss("Fast", "https://fast.test", &[("Quick", Some("https://fast.test/q"), None)]))
        .create_async()
        .await;
    let hanging = hanging_server().await;

    let feeds = vec![FeedDescriptor::new(hanging), FeedDescriptor::new(format!("{}/fast", server.url()))];

    let started = Instant::now();
    let groups = aggregator(1).aggregate(&feeds).await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].articles[0].title, "Quick");
}

#[tokio::test]
async fn undated_item_inherits_earlier_item_date() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/rss")
        .with_status(200)
        .with_body(rss(
            "Dates",
            "https://dates.test",
            &[
                ("Dated", Some("https://dates.test/1"), Some("Fri, 11 Oct 2024 18:30:00 GMT")),
                ("Undated", Some("https://dates.test/2"), None),
            ],
        ))
        .create_async()
        .await;

    let feeds = vec![FeedDescriptor::new(format!("{}/rss", server.url()))];
    let articles = aggregator(5).aggregate_flat(&feeds).await;

    assert_eq!(articles.len(), 2);
    assert!(articles[0].pub_date.is_some());
    assert_eq!(articles[1].pub_date, articles[0].pub_date);
}

#[tokio::test]
async fn every_article_has_an_http_link_and_configured_image_wins() {
    let mut server = mockito::Server::new_async().await;
    let body = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Mixed</title>
  <link>/not-absolute</link>
  <image><url>https://mixed.test/own.png</url><title>Mixed</title><link>https://mixed.test</link></image>
  <item><title>Relative</title><link>/story/1</link></item>
  <item><title>Absolute</title><link>https://mixed.test/story/2</link></item>
  <item><title></title></item>
</channel></rss>"#;
    server
        .mock("GET", "/rss")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let url = format!("{}/rss", server.url());
    let feeds = vec![FeedDescriptor::new(url.clone()).with_image("https://cdn.test/configured.png")];
    let groups = aggregator(5).aggregate(&feeds).await;

    let articles = &groups[0].articles;
    assert_eq!(articles.len(), 3);
    assert!(articles.iter().all(|a| a.link.starts_with("http")));
    assert!(articles.iter().all(|a| !a.is_custom));
    assert!(articles
        .iter()
        .all(|a| a.feed_image.as_deref() == Some("https://cdn.test/configured.png")));
    assert_eq!(articles[2].title, "Untitled");
}
