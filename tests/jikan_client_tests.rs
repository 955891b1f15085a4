//! Integration tests for the HTTP Jikan client against a local fake server.

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use animerank::cache_key::CacheKeys;
use animerank::clients::{JikanApi, JikanClient, JikanError, RequestQueue, RetryPolicy};
use animerank::config::{Config, JikanConfig, PaginationMode};
use animerank::db::Store;
use animerank::domain::{AnimeId, Season};
use animerank::services::{Acquisition, AcquisitionSettings};

#[derive(Clone, Default)]
struct FakeServer {
    hits: Arc<Mutex<Vec<String>>>,
    episode_pages: u32,
    throttle_first: u32,
    requests: Arc<AtomicU32>,
}

impl FakeServer {
    fn hit(&self, path: String) {
        self.hits.lock().unwrap().push(path);
    }

    fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

fn page_param(query: &HashMap<String, String>) -> u32 {
    query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1)
}

async fn episodes(
    State(server): State<FakeServer>,
    Path(id): Path<i32>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let page = page_param(&query);
    server.hit(format!("/anime/{id}/episodes?page={page}"));

    Json(json!({
        "data": [{
            "mal_id": (page - 1) * 100 + 1,
            "title": format!("Page {page}"),
            "aired": "2025-10-01T00:00:00+00:00",
            "score": 4.5
        }],
        "pagination": {
            "last_visible_page": server.episode_pages,
            "has_next_page": page < server.episode_pages
        }
    }))
}

async fn season(
    State(server): State<FakeServer>,
    Path((year, season_name)): Path<(i32, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let page = page_param(&query);
    server.hit(format!("/seasons/{year}/{season_name}?page={page}"));

    let n = server.requests.fetch_add(1, Ordering::SeqCst);
    if n < server.throttle_first {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "1")],
            "slow down",
        )
            .into_response();
    }

    Json(json!({
        "data": [{"mal_id": page, "title": format!("Show {page}"), "members": 50_000}],
        "pagination": {"last_visible_page": 2, "has_next_page": page < 2}
    }))
    .into_response()
}

async fn anime(State(server): State<FakeServer>, Path(id): Path<i32>) -> Response {
    server.hit(format!("/anime/{id}"));
    match id {
        1 => Json(json!({"data": {"mal_id": 1, "title": "Cowboy Bebop", "members": 4_000_000}}))
            .into_response(),
        500 => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

async fn spawn(server: FakeServer) -> String {
    let app = Router::new()
        .route("/anime/{id}/episodes", get(episodes))
        .route("/anime/{id}", get(anime))
        .route("/seasons/{year}/{season}", get(season))
        .with_state(server);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn jikan_config(base_url: String) -> JikanConfig {
    JikanConfig {
        base_url,
        min_request_interval_ms: 10,
        retry_base_delay_ms: 10,
        ..JikanConfig::default()
    }
}

fn client(base_url: String) -> JikanClient {
    let config = jikan_config(base_url);
    let queue = Arc::new(RequestQueue::new(config.min_request_interval()));
    JikanClient::new(&config, queue).unwrap()
}

async fn acquisition(base_url: String, pagination: PaginationMode) -> Acquisition {
    let mut config = Config::default();
    config.ranking.episode_pagination = pagination;

    Acquisition::new(
        Arc::new(client(base_url)),
        Store::new("sqlite::memory:").await.unwrap(),
        CacheKeys::new("test"),
        AcquisitionSettings::from(&config.ranking),
    )
}

#[tokio::test]
async fn append_only_mode_requests_first_and_last_page() {
    let server = FakeServer {
        episode_pages: 5,
        ..FakeServer::default()
    };
    let base = spawn(server.clone()).await;
    let acquisition = acquisition(base, PaginationMode::AssumeAppendOnly).await;

    let episodes = acquisition.title_episodes(AnimeId::new(21)).await.unwrap();

    assert_eq!(
        server.hits(),
        vec!["/anime/21/episodes?page=1", "/anime/21/episodes?page=5"]
    );
    let numbers: Vec<u32> = episodes.iter().map(|e| e.mal_id).collect();
    assert_eq!(numbers, vec![1, 401]);
}

#[tokio::test]
async fn full_mode_requests_every_page() {
    let server = FakeServer {
        episode_pages: 3,
        ..FakeServer::default()
    };
    let base = spawn(server.clone()).await;
    let acquisition = acquisition(base, PaginationMode::Full).await;

    let episodes = acquisition.title_episodes(AnimeId::new(21)).await.unwrap();

    assert_eq!(
        server.hits(),
        vec![
            "/anime/21/episodes?page=1",
            "/anime/21/episodes?page=2",
            "/anime/21/episodes?page=3"
        ]
    );
    assert_eq!(episodes.len(), 3);
}

#[tokio::test]
async fn single_page_listing_is_requested_once() {
    let server = FakeServer {
        episode_pages: 1,
        ..FakeServer::default()
    };
    let base = spawn(server.clone()).await;
    let acquisition = acquisition(base, PaginationMode::AssumeAppendOnly).await;

    acquisition.title_episodes(AnimeId::new(7)).await.unwrap();
    // Second read is served from the cache.
    acquisition.title_episodes(AnimeId::new(7)).await.unwrap();

    assert_eq!(server.hits(), vec!["/anime/7/episodes?page=1"]);
}

#[tokio::test]
async fn season_listing_follows_pagination() {
    let server = FakeServer::default();
    let base = spawn(server.clone()).await;
    let acquisition = acquisition(base, PaginationMode::AssumeAppendOnly).await;

    let titles = acquisition
        .season_titles(2025, Season::Fall)
        .await
        .unwrap();

    assert_eq!(titles.len(), 2);
    assert_eq!(
        server.hits(),
        vec!["/seasons/2025/fall?page=1", "/seasons/2025/fall?page=2"]
    );
}

#[tokio::test]
async fn throttled_request_waits_retry_after_then_succeeds() {
    let server = FakeServer {
        throttle_first: 1,
        ..FakeServer::default()
    };
    let base = spawn(server.clone()).await;
    let client = client(base);

    let started = Instant::now();
    let page = client.season_page(2025, Season::Fall, 1).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(page.data.len(), 1);
    assert_eq!(server.hits().len(), 2);
}

#[tokio::test]
async fn server_error_is_retried_up_to_max_attempts() {
    let server = FakeServer::default();
    let base = spawn(server.clone()).await;
    let client = client(base).with_policy(RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        ..RetryPolicy::default()
    });

    let result = client.anime(AnimeId::new(500)).await;

    assert!(matches!(result, Err(JikanError::Status { status: 500, .. })));
    assert_eq!(server.hits().len(), 3);
}

#[tokio::test]
async fn unknown_title_is_not_found_without_retry() {
    let server = FakeServer::default();
    let base = spawn(server.clone()).await;
    let client = client(base);

    let result = client.anime(AnimeId::new(999_999)).await;

    assert!(matches!(result, Err(JikanError::NotFound(id)) if id == AnimeId::new(999_999)));
    assert_eq!(server.hits(), vec!["/anime/999999"]);
}

#[tokio::test]
async fn title_detail_is_unwrapped_from_envelope() {
    let server = FakeServer::default();
    let base = spawn(server.clone()).await;

    let title = client(base).anime(AnimeId::new(1)).await.unwrap();

    assert_eq!(title.title, "Cowboy Bebop");
    assert_eq!(title.members(), 4_000_000);
}
