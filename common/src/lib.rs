/*!
common/src/lib.rs

Shared configuration types and DB helper functions for Sidelines.

This file provides:
- Config data structures (deserialized from TOML)
- The feed descriptor type consumed by the aggregation pipeline
- An async loader for a TOML config file and for standalone feed lists
- A helper to initialize an SQLite pool for the custom-content store
*/

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// HTTP bind settings, merged into Rocket's figment at launch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the sqlite database file (e.g. "data/sidelines.db")
    pub path: String,
}

/// Which record store backs custom articles and videos
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: Option<String>, // "sqlite", "none"
}

/// Feed fetching limits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_seconds: Option<u64>,
    pub connect_timeout_seconds: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub max_response_bytes: Option<u64>,
    pub user_agent: Option<String>,
}

/// One configured feed. Identity is `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDescriptor {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "is_podcast")]
    pub is_podcast: Option<bool>,
    #[serde(default, alias = "is_top_channel")]
    pub is_top_channel: Option<bool>,
    #[serde(default, alias = "is_up_and_coming")]
    pub is_up_and_coming: Option<bool>,
}

impl FeedDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            image: None,
            is_podcast: None,
            is_top_channel: None,
            is_up_and_coming: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Feed list section. When `file` is set the list is read from that file on every
/// aggregation pass so edits made by the admin tooling show up without a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedsConfig {
    pub file: Option<String>,
    #[serde(default)]
    pub sources: Vec<FeedDescriptor>,
}

/// Third-party sports statistics API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SportsDataConfig {
    pub base_url: String,
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Admin / maintenance config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    pub auto_migrate: Option<bool>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: Option<ServerConfig>,
    pub database: Option<DatabaseConfig>,
    pub store: Option<StoreConfig>,
    pub fetch: Option<FetchConfig>,
    #[serde(default)]
    pub feeds: FeedsConfig,
    pub sports_data: Option<SportsDataConfig>,
    pub admin: Option<AdminConfig>,
}

/// Record store backend resolved from `[store]` and `[database]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite { path: String },
    None,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Pick the record store backend. An explicit `[store] backend` wins; otherwise a
    /// configured `[database]` means sqlite and its absence means the no-op store.
    pub fn store_backend(&self) -> Result<StoreBackend> {
        let requested = self.store.as_ref().and_then(|s| s.backend.as_deref());
        match (requested, &self.database) {
            (Some("none"), _) | (None, None) => Ok(StoreBackend::None),
            (Some("sqlite"), Some(db)) | (None, Some(db)) => Ok(StoreBackend::Sqlite { path: db.path.clone() }),
            (Some("sqlite"), None) => bail!("store backend 'sqlite' requires a [database] section"),
            (Some(other), _) => bail!("Unknown store backend: {}", other),
        }
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// On-disk feed list: `[[feeds]]` tables in TOML, or a JSON array / `{ "feeds": [...] }` object.
#[derive(Debug, Deserialize)]
struct FeedListFile {
    #[serde(default)]
    feeds: Vec<FeedDescriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonFeedList {
    Bare(Vec<FeedDescriptor>),
    Wrapped(FeedListFile),
}

/// Read and validate a feed list file. JSON is picked by the `.json` extension, TOML otherwise.
pub async fn load_feed_list<P: AsRef<Path>>(path: P) -> Result<Vec<FeedDescriptor>> {
    let path = path.as_ref();
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read feed list: {}", path.display()))?;

    let feeds = if path.extension().map_or(false, |ext| ext == "json") {
        match serde_json::from_str::<JsonFeedList>(&data)
            .with_context(|| format!("Failed to parse JSON feed list: {}", path.display()))?
        {
            JsonFeedList::Bare(feeds) => feeds,
            JsonFeedList::Wrapped(file) => file.feeds,
        }
    } else {
        toml::from_str::<FeedListFile>(&data)
            .with_context(|| format!("Failed to parse TOML feed list: {}", path.display()))?
            .feeds
    };

    validate_feed_list(&feeds)?;
    Ok(feeds)
}

/// Every descriptor needs a non-empty, parseable URL. Anything else makes the whole list unusable.
pub fn validate_feed_list(feeds: &[FeedDescriptor]) -> Result<()> {
    for (idx, feed) in feeds.iter().enumerate() {
        let raw = feed.url.trim();
        if raw.is_empty() {
            bail!("feed #{} has an empty url", idx + 1);
        }
        url::Url::parse(raw).with_context(|| format!("feed #{} has an invalid url: {}", idx + 1, raw))?;
    }
    Ok(())
}

/// Initialize an SQLite connection pool.
///
/// This function will create the parent directory if necessary, ensure the DB file exists
/// (attempting to create it if missing), and return a configured `SqlitePool`. Defaults are
/// conservative:
/// - max_connections: 5
/// - WAL journal mode
///
/// Example:
///   let pool = init_db_pool("data/sidelines.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create DB parent directory: {}", parent.display())
            })?;
        }
    }

    // Creating the file up front gives a clearer error for permission or path issues
    // than the SQLite connection attempt would.
    tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to create or open DB file: {}", path))?;

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_string() {
        let toml = r#"
            [database]
            path = "data/test.db"

            [fetch]
            timeout_seconds = 5
            max_concurrency = 4

            [[feeds.sources]]
            url = "https://a.test/rss"
            title = "A"
            is_podcast = true

            [[feeds.sources]]
            url = "https://b.test/rss"
            isTopChannel = true
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.fetch.as_ref().and_then(|f| f.timeout_seconds), Some(5));
        assert_eq!(cfg.feeds.sources.len(), 2);
        assert_eq!(cfg.feeds.sources[0].is_podcast, Some(true));
        assert_eq!(cfg.feeds.sources[1].is_top_channel, Some(true));
        assert_eq!(
            cfg.store_backend().unwrap(),
            StoreBackend::Sqlite { path: "data/test.db".into() }
        );
    }

    #[test]
    fn store_backend_selection() {
        let cfg = Config::default();
        assert_eq!(cfg.store_backend().unwrap(), StoreBackend::None);

        let cfg: Config = toml::from_str("[store]\nbackend = \"sqlite\"\n").unwrap();
        assert!(cfg.store_backend().is_err());

        let cfg: Config = toml::from_str(
            "[store]\nbackend = \"none\"\n[database]\npath = \"x.db\"\n",
        )
        .unwrap();
        assert_eq!(cfg.store_backend().unwrap(), StoreBackend::None);

        let cfg: Config = toml::from_str("[store]\nbackend = \"redis\"\n").unwrap();
        assert!(cfg.store_backend().is_err());
    }

    #[tokio::test]
    async fn override_file_wins_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");
        std::fs::write(
            &default_path,
            "[fetch]\ntimeout_seconds = 10\nmax_concurrency = 8\n[server]\nport = 8000\n",
        )
        .unwrap();
        std::fs::write(&override_path, "[fetch]\ntimeout_seconds = 3\n").unwrap();

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load");
        let fetch = cfg.fetch.expect("fetch section");
        assert_eq!(fetch.timeout_seconds, Some(3));
        assert_eq!(fetch.max_concurrency, Some(8));
        assert_eq!(cfg.server.and_then(|s| s.port), Some(8000));
    }

    #[tokio::test]
    async fn feed_list_toml_and_json() {
        let dir = tempfile::tempdir().expect("tempdir");

        let toml_path = dir.path().join("feeds.toml");
        std::fs::write(
            &toml_path,
            "[[feeds]]\nurl = \"https://a.test/rss\"\nimage = \"https://a.test/logo.png\"\n",
        )
        .unwrap();
        let feeds = load_feed_list(&toml_path).await.expect("toml list");
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].image.as_deref(), Some("https://a.test/logo.png"));

        let json_path = dir.path().join("feeds.json");
        std::fs::write(
            &json_path,
            r#"[{"url":"https://a.test/rss"},{"url":"https://b.test/rss","isUpAndComing":true}]"#,
        )
        .unwrap();
        let feeds = load_feed_list(&json_path).await.expect("json list");
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[1].is_up_and_coming, Some(true));
    }

    #[tokio::test]
    async fn feed_list_rejects_empty_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feeds.toml");
        std::fs::write(&path, "[[feeds]]\nurl = \"  \"\n").unwrap();
        assert!(load_feed_list(&path).await.is_err());

        let missing = dir.path().join("nope.toml");
        assert!(load_feed_list(&missing).await.is_err());
    }

    #[tokio::test]
    async fn db_pool_in_temp_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("sidelines.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = init_db_pool(&db_path_str).await.expect("init pool");
        let conn = pool.acquire().await.expect("acquire conn");
        drop(conn);
        assert!(db_path.exists());
    }
}
