//! HTTP boundary tests against an in-memory document store

use std::sync::Arc;

use aichef::api::handlers::AppState;
use aichef::api::routes::api_routes;
use aichef::config::AppConfig;
use aichef::rag::RecipeService;
use aichef::store::DocumentStore;
use aichef::store::ScoredDocument;
use aichef::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use axum::Router;
use serde_json::json;
use serde_json::Value;
use tower::util::ServiceExt;

struct StaticStore {
    docs: Vec<ScoredDocument>,
}

#[async_trait]
impl DocumentStore for StaticStore {
    async fn query(&self, _text: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        Ok(self.docs.iter().take(k).cloned().collect())
    }
}

fn app(docs: Vec<ScoredDocument>) -> Router {
    let config = AppConfig::default();
    let recipe_service = Arc::new(RecipeService::new(
        Arc::new(StaticStore { docs }),
        None,
        &config,
    ));
    Router::new().nest("/api", api_routes(AppState { recipe_service }))
}

fn recipe_doc(name: &str, score: f32) -> ScoredDocument {
    let metadata = json!({
        "id": "r1",
        "name": name,
        "tags": r#"["家常菜"]"#,
        "image": "http://img/cover.png",
        "instructions": r#"[{"description":"下锅","imgLink":"null"}]"#,
    });
    ScoredDocument {
        content: format!("菜名: {name}"),
        metadata: metadata.as_object().unwrap().clone(),
        score,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app(vec![]);
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_search_returns_recipe() {
    let app = app(vec![recipe_doc("番茄炒蛋", 0.3)]);
    let response = app
        .oneshot(post_json("/api/search", json!({"query": "番茄炒蛋"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["recipe_name"], "番茄炒蛋");
    assert_eq!(body["steps"].as_array().unwrap().len(), 1);
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_not_found_echoes_query() {
    let app = app(vec![]);
    let response = app
        .oneshot(post_json("/api/search", json!({"query": "佛跳墙"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("佛跳墙"));
}

#[tokio::test]
async fn test_search_blank_query_is_bad_request() {
    let app = app(vec![recipe_doc("番茄炒蛋", 0.3)]);
    let response = app
        .oneshot(post_json("/api/search", json!({"query": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_answer_returns_sources() {
    let app = app(vec![recipe_doc("麻婆豆腐", 0.2), recipe_doc("清蒸鱼", 0.4)]);
    let response = app
        .oneshot(post_json("/api/answer", json!({"query": "想吃豆腐"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(!body["answer"].as_str().unwrap().is_empty());
    assert_eq!(body["source_docs"].as_array().unwrap().len(), 2);
}
