use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use serde_json::{json, Value};

use recipe_harvest::{
    api::{create_router, AppState},
    db::RecipeStore,
    error::{AppError, AppResult, FetchError, FetchResult},
    models::{watch_url, NewRecipe, Recipe, VideoMetadata},
    services::{
        BatchRunner, ItemProcessor, PlaylistResolver, RecipeExtractor, StatusBoard, TextGenerator,
        VideoSource,
    },
};

#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<Recipe>>,
    unreachable: bool,
}

impl MemoryStore {
    /// Every candidate scan fails as if the database were down
    fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    fn seeded(rows: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut guard = store.rows.lock().unwrap();
            for (i, (title, ingredients)) in rows.iter().enumerate() {
                guard.push(Recipe {
                    id: i as i64 + 1,
                    item_id: format!("seed-{}", i),
                    title: title.to_string(),
                    description: None,
                    ingredients: Some(ingredients.to_string()),
                    dish_name: Some(title.to_string()),
                    url: watch_url(&format!("seed-{}", i)),
                    data_sources: None,
                    created_at: Utc::now(),
                });
            }
        }
        store
    }
}

#[async_trait::async_trait]
impl RecipeStore for MemoryStore {
    async fn exists(&self, item_id: &str) -> AppResult<bool> {
        Ok(self.rows.lock().unwrap().iter().any(|r| r.item_id == item_id))
    }

    async fn insert(&self, recipe: &NewRecipe) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.item_id == recipe.item_id) {
            return Err(AppError::Duplicate(recipe.item_id.clone()));
        }
        let id = rows.len() as i64 + 1;
        rows.push(Recipe {
            id,
            item_id: recipe.item_id.clone(),
            title: recipe.title.clone(),
            description: Some(recipe.description.clone()),
            ingredients: Some(recipe.ingredients.clone()),
            dish_name: Some(recipe.dish_name.clone()),
            url: recipe.url.clone(),
            data_sources: Some(recipe.data_sources.clone()),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn find_by_any_ingredient(&self, tokens: &[String]) -> AppResult<Vec<Recipe>> {
        if self.unreachable {
            return Err(AppError::Internal("connection refused".to_string()));
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| {
                let stored = r.ingredients.as_deref().unwrap_or_default();
                tokens.iter().any(|t| stored.contains(t.as_str()))
            })
            .cloned()
            .collect())
    }

    async fn count(&self) -> AppResult<i64> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }
}

/// Every video exists and has a description only
struct DescriptionOnly;

#[async_trait::async_trait]
impl VideoSource for DescriptionOnly {
    async fn fetch_metadata(&self, item_id: &str) -> FetchResult<VideoMetadata> {
        Ok(VideoMetadata {
            item_id: item_id.to_string(),
            title: format!("Recipe {}", item_id),
            description: "rice, egg, soy sauce".to_string(),
            url: watch_url(item_id),
        })
    }

    async fn fetch_captions(&self, item_id: &str) -> FetchResult<String> {
        Err(FetchError::TranscriptUnavailable(item_id.to_string()))
    }

    async fn fetch_top_comments(&self, item_id: &str, _limit: u32) -> FetchResult<String> {
        Err(FetchError::NotFound(format!("comments for {}", item_id)))
    }
}

struct FixedPlaylists(HashMap<String, Vec<String>>);

#[async_trait::async_trait]
impl PlaylistResolver for FixedPlaylists {
    async fn list_items(&self, playlist_id: &str) -> AppResult<Vec<String>> {
        self.0
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("playlist {}", playlist_id)))
    }
}

struct FencedReply;

#[async_trait::async_trait]
impl TextGenerator for FencedReply {
    async fn generate(&self, _prompt: &str) -> AppResult<String> {
        Ok("```json\n{\"dish_name\": \"Egg Fried Rice\", \"ingredients\": [\"rice\", \" egg \", \"soy sauce\"]}\n```".to_string())
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn create_test_server(store: Arc<MemoryStore>) -> TestServer {
    let status = StatusBoard::new();
    let processor = ItemProcessor::new(
        Arc::new(DescriptionOnly),
        RecipeExtractor::new(Arc::new(FencedReply)),
        store.clone(),
        status.clone(),
        8,
    );
    let runner = BatchRunner::new(processor, status.clone(), 10, Duration::ZERO);

    let mut playlists = HashMap::new();
    playlists.insert(
        "PLlong".to_string(),
        (0..12).map(|i| format!("vid{}", i)).collect(),
    );
    playlists.insert("PLempty".to_string(), vec![]);

    let state = AppState::new(store, Arc::new(FixedPlaylists(playlists)), runner, status);
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(Arc::new(MemoryStore::default()));
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server(Arc::new(MemoryStore::default()));
    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static("trace-me"),
        )
        .await;
    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

#[tokio::test]
async fn test_start_run_rejects_invalid_url() {
    let server = create_test_server(Arc::new(MemoryStore::default()));
    let response = server
        .post("/api/v1/runs")
        .json(&json!({ "playlist_url": "https://www.youtube.com/watch?v=abc" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_start_run_requires_playlist_url() {
    let server = create_test_server(Arc::new(MemoryStore::default()));
    let response = server.post("/api/v1/runs").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "Please enter a playlist URL");
}

#[tokio::test]
async fn test_start_run_rejects_unreadable_body() {
    let server = create_test_server(Arc::new(MemoryStore::default()));
    let response = server
        .post("/api/v1/runs")
        .json(&json!({ "playlist_url": 42 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_start_run_rejects_unknown_playlist() {
    let server = create_test_server(Arc::new(MemoryStore::default()));
    let response = server
        .post("/api/v1/runs")
        .json(&json!({ "playlist_url": "https://www.youtube.com/playlist?list=PLnowhere" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"], "Could not load playlist");
}

#[tokio::test]
async fn test_start_run_rejects_empty_playlist() {
    let server = create_test_server(Arc::new(MemoryStore::default()));
    let response = server
        .post("/api/v1/runs")
        .json(&json!({ "playlist_url": "https://www.youtube.com/playlist?list=PLempty" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_run_processes_capped_playlist() {
    let store = Arc::new(MemoryStore::default());
    let server = create_test_server(store.clone());

    let response = server
        .post("/api/v1/runs")
        .json(&json!({ "playlist_url": "https://www.youtube.com/playlist?list=PLlong" }))
        .await;
    response.assert_status(StatusCode::ACCEPTED);

    let started: Value = response.json();
    assert_eq!(started["total_items"], 10);
    assert_eq!(started["original_count"], 12);
    assert_eq!(started["limited"], true);
    let run_id = started["run_id"].as_str().unwrap().to_string();

    let mut status = Value::Null;
    for _ in 0..100 {
        status = server.get(&format!("/api/v1/runs/{}", run_id)).await.json();
        if status["completed"] == true {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(status["completed"], true);
    assert_eq!(status["total"], 10);
    assert_eq!(status["success_count"], 10);
    assert_eq!(status["error_count"], 0);

    let rows = store.rows.lock().unwrap().clone();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0].item_id, "vid0");
    assert_eq!(rows[0].ingredients.as_deref(), Some("rice,egg,soysauce"));
    assert_eq!(rows[0].dish_name.as_deref(), Some("Egg Fried Rice"));
    assert_eq!(rows[0].data_sources.as_deref(), Some("description"));

    let count: Value = server.get("/api/v1/recipes/count").await.json();
    assert_eq!(count["count"], 10);
}

#[tokio::test]
async fn test_unknown_run_reads_as_pending() {
    let server = create_test_server(Arc::new(MemoryStore::default()));
    let response = server.get("/api/v1/runs/not-a-run").await;
    response.assert_status_ok();

    let status: Value = response.json();
    assert_eq!(status["current"], 0);
    assert_eq!(status["completed"], false);
}

#[tokio::test]
async fn test_recommendations_empty_query() {
    let server = create_test_server(Arc::new(MemoryStore::default()));
    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "ingredients": ",, ," }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["outcome"], "empty_query");
    assert_eq!(body["message"], "Please enter ingredients.");
}

#[tokio::test]
async fn test_recommendations_no_matches() {
    let store = Arc::new(MemoryStore::seeded(&[("Bibimbap", "rice,egg,spinach")]));
    let server = create_test_server(store);

    let body: Value = server
        .post("/api/v1/recommendations")
        .json(&json!({ "ingredients": "truffle" }))
        .await
        .json();
    assert_eq!(body["outcome"], "no_matches");
}

#[tokio::test]
async fn test_recommendations_ranked() {
    let store = Arc::new(MemoryStore::seeded(&[
        ("R1", "a,b,c"),
        ("R2", "a,b"),
        ("Unrelated", "x,y"),
    ]));
    let server = create_test_server(store);

    let body: Value = server
        .post("/api/v1/recommendations")
        .json(&json!({ "ingredients": "a, b" }))
        .await
        .json();

    assert_eq!(body["outcome"], "matches");
    let recipes = body["recipes"].as_array().unwrap();
    assert_eq!(recipes.len(), 2);
    assert_eq!(recipes[0]["title"], "R2");
    assert_eq!(recipes[0]["match_rate"], "100.0");
    assert_eq!(recipes[1]["title"], "R1");
    assert_eq!(recipes[1]["match_rate"], "66.7");
    assert_eq!(recipes[1]["missing"], "c");
    assert_eq!(recipes[1]["sources"], "none");
}

#[tokio::test]
async fn test_recommendations_store_failure_is_message() {
    let server = create_test_server(Arc::new(MemoryStore::unreachable()));

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "ingredients": "tofu" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["outcome"], "unavailable");
    assert!(!body["message"].as_str().unwrap().contains("connection refused"));
}
