//! Client for the third-party sports statistics API.
//!
//! Providers disagree on field names (and nesting) for the same value, so each field
//! of `TeamStanding` is resolved through its own explicit precedence list of JSON paths.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use common::SportsDataConfig;

/// A path of object keys into a JSON value, e.g. `&["record", "wins"]`.
pub type FieldPath = &'static [&'static str];

const TEAM_NAME: &[FieldPath] = &[&["team", "name"], &["teamName"], &["team_name"], &["name"], &["team"]];
const ABBREVIATION: &[FieldPath] = &[&["team", "abbreviation"], &["abbreviation"], &["abbr"], &["key"]];
const WINS: &[FieldPath] = &[&["wins"], &["w"], &["record", "wins"], &["stats", "wins"]];
const LOSSES: &[FieldPath] = &[&["losses"], &["l"], &["record", "losses"], &["stats", "losses"]];
const TIES: &[FieldPath] = &[&["ties"], &["t"], &["record", "ties"], &["stats", "ties"]];
const WIN_PCT: &[FieldPath] = &[&["winPercentage"], &["win_pct"], &["pct"], &["record", "pct"]];

/// Where the list of rows lives in a standings payload, in order of preference.
/// The empty path means the payload itself is the list.
const STANDINGS_ROWS: &[FieldPath] = &[&[], &["standings"], &["data"], &["teams"], &["response"]];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStanding {
    pub team: String,
    pub abbreviation: Option<String>,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub win_pct: f64,
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}

/// First path holding a non-empty string.
pub fn resolve_str(value: &Value, paths: &[FieldPath]) -> Option<String> {
    paths
        .iter()
        .filter_map(|p| lookup(value, p))
        .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

/// First path holding a non-negative integer, as a number or a numeric string.
pub fn resolve_u32(value: &Value, paths: &[FieldPath]) -> Option<u32> {
    paths.iter().filter_map(|p| lookup(value, p)).find_map(|v| match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// First path holding a number, or a numeric string such as `".615"`.
pub fn resolve_f64(value: &Value, paths: &[FieldPath]) -> Option<f64> {
    paths.iter().filter_map(|p| lookup(value, p)).find_map(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Resolve one standings row. Rows without a team name are unusable.
pub fn resolve_standing(row: &Value) -> Option<TeamStanding> {
    let team = resolve_str(row, TEAM_NAME)?;
    let wins = resolve_u32(row, WINS).unwrap_or(0);
    let losses = resolve_u32(row, LOSSES).unwrap_or(0);
    let ties = resolve_u32(row, TIES).unwrap_or(0);

    // u64: three u32 counts can exceed u32::MAX.
    let played = u64::from(wins) + u64::from(losses) + u64::from(ties);
    let win_pct = resolve_f64(row, WIN_PCT).unwrap_or_else(|| {
        if played == 0 {
            0.0
        } else {
            (f64::from(wins) + 0.5 * f64::from(ties)) / played as f64
        }
    });

    Some(TeamStanding {
        team,
        abbreviation: resolve_str(row, ABBREVIATION),
        wins,
        losses,
        ties,
        win_pct,
    })
}

pub fn resolve_standings(payload: &Value) -> Vec<TeamStanding> {
    STANDINGS_ROWS
        .iter()
        .filter_map(|p| lookup(payload, p))
        .find_map(Value::as_array)
        .map(|rows| rows.iter().filter_map(resolve_standing).collect())
        .unwrap_or_default()
}

/// Read-only HTTP client for the sports statistics API.
pub struct SportsDataClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl SportsDataClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// The API key is read from the environment variable named in the config, if any.
    pub fn from_config(config: &SportsDataConfig) -> Result<Self> {
        let api_key = match config.api_key_env.as_deref() {
            Some(var) => Some(
                std::env::var(var)
                    .with_context(|| format!("sports data API key env var '{}' not set", var))?,
            ),
            None => None,
        };
        Self::new(&config.base_url, api_key, config.timeout_seconds.unwrap_or(10))
    }

    pub async fn standings(&self) -> Result<Vec<TeamStanding>> {
        let url = format!("{}/standings", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.context("sports data request failed")?;
        if !response.status().is_success() {
            anyhow::bail!("sports data API error {}", response.status());
        }

        let payload: Value = response
            .json()
            .await
            .context("Failed to parse sports data response")?;
        Ok(resolve_standings(&payload))
    }
}
