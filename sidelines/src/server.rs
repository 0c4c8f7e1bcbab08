use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, routes, Build, Rocket, State};
use serde::Serialize;

use common::ServerConfig;

use crate::model::{ErrorBody, NewsResponse, SourceGroup, VideoSection};
use crate::service::NewsService;
use crate::stats::{SportsDataClient, TeamStanding};

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub news: NewsService,
    pub sports_data: Option<Arc<SportsDataClient>>,
}

impl AppState {
    pub fn new(news: NewsService, sports_data: Option<Arc<SportsDataClient>>) -> Self {
        Self {
            started_at: Utc::now(),
            news,
            sports_data,
        }
    }
}

type ApiError = Custom<Json<ErrorBody>>;

fn api_error(status: Status, message: &str) -> ApiError {
    Custom(
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
}

/// Response structure for `/api/v1/status`.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    uptime_seconds: i64,
    feeds: String,
    store_backend: &'static str,
    sports_data: bool,
}

#[get("/health")]
async fn health() -> &'static str {
    "OK"
}

/// Status endpoint returning simple JSON with uptime and wiring info.
#[get("/api/v1/status")]
async fn status(state: &State<AppState>) -> Json<StatusResponse> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    Json(StatusResponse {
        status: "ok",
        uptime_seconds: uptime,
        feeds: state.news.feeds_description(),
        store_backend: state.news.store_backend(),
        sports_data: state.sports_data.is_some(),
    })
}

/// One full aggregation pass, flattened. Per-feed failures only shorten the list;
/// a 500 means the feed configuration itself could not be read.
#[get("/api/news")]
async fn news(state: &State<AppState>) -> Result<Json<NewsResponse>, ApiError> {
    state
        .news
        .news()
        .await
        .map(|articles| Json(NewsResponse { articles }))
        .map_err(|e| {
            tracing::error!("news: aggregation failed: {:#}", e);
            api_error(Status::InternalServerError, "Failed to load news feeds")
        })
}

#[get("/api/v1/sources")]
async fn sources(state: &State<AppState>) -> Result<Json<Vec<SourceGroup>>, ApiError> {
    state.news.sources().await.map(Json).map_err(|e| {
        tracing::error!("sources: aggregation failed: {:#}", e);
        api_error(Status::InternalServerError, "Failed to load news feeds")
    })
}

#[get("/api/v1/videos")]
async fn videos(state: &State<AppState>) -> Json<Vec<VideoSection>> {
    Json(state.news.videos().await)
}

#[get("/api/v1/standings")]
async fn standings(state: &State<AppState>) -> Result<Json<Vec<TeamStanding>>, ApiError> {
    let client = state
        .sports_data
        .as_ref()
        .ok_or_else(|| api_error(Status::ServiceUnavailable, "Standings are not available"))?;

    client.standings().await.map(Json).map_err(|e| {
        tracing::warn!("standings: sports data request failed: {:#}", e);
        api_error(Status::BadGateway, "Failed to load standings")
    })
}

/// Build the Rocket instance with managed state and routes, applying `[server]`
/// bind/port on top of Rocket's own figment.
pub fn build_rocket(state: AppState, server: Option<&ServerConfig>) -> Rocket<Build> {
    let mut fig = rocket::Config::figment();
    if let Some(bind) = server.and_then(|s| s.bind.as_deref()) {
        fig = fig.merge(("address", bind.to_string()));
    }
    if let Some(port) = server.and_then(|s| s.port) {
        fig = fig.merge(("port", port));
    }

    rocket::custom(fig).manage(state).mount(
        "/",
        routes![health, status, news, sources, videos, standings],
    )
}

/// Launch the server; blocks until Rocket shuts down.
pub async fn launch_rocket(state: AppState, server: Option<&ServerConfig>) -> Result<()> {
    tracing::info!("Starting Rocket HTTP server");
    build_rocket(state, server)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
