//! HTTP surface tests, driven through the router with `tower::ServiceExt`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::problems::FALLBACK_LABEL;
use crate::tests::{test_bank, StubEmbedder};
use crate::web::{router, SharedState};

const API_KEY: &str = "test-secret";

fn test_router(embedder: StubEmbedder) -> Router {
    let (bank, _index) = test_bank(embedder);
    router(Arc::new(SharedState {
        bank: Arc::new(bank),
        api_key: API_KEY.to_string(),
    }))
}

fn post_json(uri: &str, body: Value, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_root_hello_world() {
    let app = test_router(StubEmbedder::new());

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"message": "Hello World"}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_classify_requires_api_key() {
    let app = test_router(StubEmbedder::new());

    // missing header
    let response = app
        .clone()
        .oneshot(post_json("/classify", json!({"text": "2x+3=7を解け"}), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // wrong key
    let response = app
        .oneshot(post_json(
            "/classify",
            json!({"text": "2x+3=7を解け"}),
            Some("wrong"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_classify_returns_fallback_on_empty_index() {
    let app = test_router(StubEmbedder::new());

    let response = app
        .oneshot(post_json(
            "/classify",
            json!({"text": "2x+3=7を解け"}),
            Some(API_KEY),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/json; charset=utf-8")
    );

    let body = body_json(response).await;
    assert_eq!(body["input"], "2x+3=7を解け");
    assert_eq!(body["suggested_labels"], json!([FALLBACK_LABEL]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_store_reports_inserted_then_duplicate() {
    let embedder = StubEmbedder::new().with_vector("2x+3=7を解け", vec![1.0, 0.0, 0.0, 0.0]);
    let app = test_router(embedder);

    let payload = json!({"text": "2x+3=7を解け", "labels": ["数学 - 1次方程式"]});

    let response = app
        .clone()
        .oneshot(post_json("/store", payload.clone(), Some(API_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stored"], json!(true));

    let response = app
        .oneshot(post_json("/store", payload, Some(API_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stored"], json!(false));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_meta_store_is_unauthenticated_and_reports_batch() {
    let embedder = StubEmbedder::new()
        .with_vector("2x+3=7を解け", vec![1.0, 0.0, 0.0, 0.0])
        .with_vector("物体の運動方程式を求めよ", vec![0.0, 1.0, 0.0, 0.0]);
    let app = test_router(embedder);

    let body = "数学,方程式:2x+3=7を解け\n理科 - 力学:物体の運動方程式を求めよ";
    let response = app
        .oneshot(post_json("/meta_store", json!({"text": body}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "status": "success",
            "stored": 2,
            "labels": [["数学", "方程式"], ["理科 - 力学"]],
        })
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_meta_store_malformed_line_is_bad_request() {
    let app = test_router(StubEmbedder::new());

    let response = app
        .oneshot(post_json("/meta_store", json!({"text": "コロンがない行"}), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_search_returns_similar_texts_excluding_self() {
    let embedder = StubEmbedder::new()
        .with_vector("2x+3=7を解け", vec![1.0, 0.0, 0.0, 0.0])
        .with_vector("3x-1=5を解け", vec![0.9, 0.1, 0.0, 0.0]);
    let app = test_router(embedder);

    for text in ["2x+3=7を解け", "3x-1=5を解け"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/store",
                json!({"text": text, "labels": ["数学 - 1次方程式"]}),
                Some(API_KEY),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(post_json(
            "/search",
            json!({"text": "2x+3=7を解け", "labels": ["数学 - 1次方程式"]}),
            Some(API_KEY),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Text searched successfully!");
    assert_eq!(body["text"], "2x+3=7を解け");

    let similar = body["similar_texts"].as_array().unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0]["text"], "3x-1=5を解け");
    assert!(similar[0]["score"].is_number());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_empty_text_is_bad_request() {
    let app = test_router(StubEmbedder::new());

    let response = app
        .oneshot(post_json("/classify", json!({"text": "  "}), Some(API_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
