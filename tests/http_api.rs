//! HTTP API tests.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`, so no
//! socket is bound. Covers:
//! - status codes and JSON shapes of every route
//! - the structured error body
//! - route precedence of `/todo/search` over `/todo/{id}`
//! - response headers and request-id propagation

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use todo_app::{ApiError, ApiServer, Item, ItemStatus, ItemStore, MapStore, TodoService};
use tower::ServiceExt;

// ============================================================================
// Test Helpers
// ============================================================================

fn app() -> Router {
    let store = Arc::new(MapStore::new());
    store.open().unwrap();
    ApiServer::new(TodoService::new(store)).router()
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn read_json<T: DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create(app: &Router, task: &str) -> Item {
    let response = send(
        app,
        request(Method::POST, "/api/v1/todo", Some(json!({ "task": task }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

// ============================================================================
// Create / Read
// ============================================================================

#[tokio::test]
async fn post_creates_item_with_created_status() {
    let app = app();
    let response = send(
        &app,
        request(
            Method::POST,
            "/api/v1/todo",
            Some(json!({ "task": "Buy milk", "status": "COMPLETED", "id": 99 })),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = read_json(response).await;
    assert_eq!(body, json!({ "id": 0, "task": "Buy milk", "status": "CREATED" }));
}

#[tokio::test]
async fn post_with_malformed_body_is_bad_request() {
    let app = app();
    let response = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/todo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.code, 400);
    assert_eq!(err.message, "failed to add a new item");
    assert_eq!(err.operation, "POST /api/v1/todo");
    assert!(!err.embedded_error.is_empty());
}

#[tokio::test]
async fn get_all_lists_created_items() {
    let app = app();
    let empty: Vec<Item> =
        read_json(send(&app, request(Method::GET, "/api/v1/todo", None)).await).await;
    assert!(empty.is_empty());

    create(&app, "A").await;
    create(&app, "B").await;

    let response = send(&app, request(Method::GET, "/api/v1/todo", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let items: Vec<Item> = read_json(response).await;
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn get_one_returns_item() {
    let app = app();
    let item = create(&app, "A").await;

    let uri = format!("/api/v1/todo/{}", item.id);
    let response = send(&app, request(Method::GET, &uri, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json::<Item>(response).await, item);
}

#[tokio::test]
async fn get_missing_has_structured_404() {
    let app = app();
    let response = send(&app, request(Method::GET, "/api/v1/todo/42", None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = read_json(response).await;
    assert_eq!(
        body,
        json!({
            "code": 404,
            "message": "failed to retrieve item with id 42",
            "operation": "GET /api/v1/todo/42",
            "embeddedError": "item with id 42 not found"
        })
    );
}

#[tokio::test]
async fn non_integer_id_is_bad_request() {
    let app = app();
    for method in [Method::GET, Method::DELETE] {
        let response = send(&app, request(method, "/api/v1/todo/abc", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let err: ApiError = read_json(response).await;
        assert_eq!(err.message, "invalid format of ID value");
    }
}

#[tokio::test]
async fn undecodable_id_segment_is_structured_bad_request() {
    let app = app();
    for method in [Method::GET, Method::DELETE] {
        let response = send(&app, request(method.clone(), "/api/v1/todo/%FF", None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{method}");
        let err: ApiError = read_json(response).await;
        assert_eq!(err.code, 400);
        assert_eq!(err.message, "invalid format of ID value");
        assert_eq!(err.operation, format!("{method} /api/v1/todo/%FF"));
        assert!(!err.embedded_error.is_empty());
    }

    let response = send(
        &app,
        request(Method::PUT, "/api/v1/todo/%FF", Some(json!({ "task": "x" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.message, "invalid format of ID value");
}

// ============================================================================
// Update / Delete
// ============================================================================

#[tokio::test]
async fn put_applies_partial_update() {
    let app = app();
    let item = create(&app, "A").await;
    let uri = format!("/api/v1/todo/{}", item.id);

    let response = send(
        &app,
        request(Method::PUT, &uri, Some(json!({ "task": "", "status": "COMPLETED" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Item = read_json(response).await;
    assert_eq!(updated.task, "A");
    assert_eq!(updated.status, ItemStatus::Completed);

    let response = send(&app, request(Method::PUT, &uri, Some(json!({ "task": "A2" })))).await;
    let updated: Item = read_json(response).await;
    assert_eq!(updated.task, "A2");
    assert_eq!(updated.status, ItemStatus::Completed);
}

#[tokio::test]
async fn put_invalid_status_is_server_error() {
    let app = app();
    let item = create(&app, "A").await;
    let uri = format!("/api/v1/todo/{}", item.id);

    let response = send(&app, request(Method::PUT, &uri, Some(json!({ "status": "DONE" })))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.message, format!("failed to update item with id {}", item.id));
    assert!(err.embedded_error.contains("DONE"));

    let unchanged: Item = read_json(send(&app, request(Method::GET, &uri, None)).await).await;
    assert_eq!(unchanged, item);
}

#[tokio::test]
async fn put_missing_is_not_found() {
    let app = app();
    let response = send(
        &app,
        request(Method::PUT, "/api/v1/todo/7", Some(json!({ "task": "x" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_returns_prior_item_then_404() {
    let app = app();
    let item = create(&app, "A").await;
    let uri = format!("/api/v1/todo/{}", item.id);

    let response = send(&app, request(Method::DELETE, &uri, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json::<Item>(response).await, item);

    let response = send(&app, request(Method::DELETE, &uri, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&app, request(Method::GET, &uri, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn search_is_not_captured_by_id_route() {
    let app = app();
    create(&app, "Buy Milk").await;
    create(&app, "Call mom").await;

    let response = send(&app, request(Method::GET, "/api/v1/todo/search?q=milk", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let items: Vec<Item> = read_json(response).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].task, "Buy Milk");
}

#[tokio::test]
async fn mutating_the_search_segment_is_a_malformed_id() {
    let app = app();
    create(&app, "A").await;

    let response = send(
        &app,
        request(Method::PUT, "/api/v1/todo/search", Some(json!({ "task": "x" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.message, "invalid format of ID value");
    assert_eq!(err.operation, "PUT /api/v1/todo/search");

    let response = send(&app, request(Method::DELETE, "/api/v1/todo/search", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.message, "invalid format of ID value");
    assert_eq!(err.operation, "DELETE /api/v1/todo/search");

    let items: Vec<Item> =
        read_json(send(&app, request(Method::GET, "/api/v1/todo", None)).await).await;
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn search_without_query_is_bad_request() {
    let app = app();
    for uri in ["/api/v1/todo/search", "/api/v1/todo/search?q="] {
        let response = send(&app, request(Method::GET, uri, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let err: ApiError = read_json(response).await;
        assert_eq!(err.message, "query parameter 'q' is required");
        assert_eq!(err.operation, "GET /api/v1/todo/search");
    }
}

#[tokio::test]
async fn search_with_no_match_is_empty_list() {
    let app = app();
    create(&app, "A").await;
    let response = send(&app, request(Method::GET, "/api/v1/todo/search?q=zzz", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(read_json::<Vec<Item>>(response).await.is_empty());
}

// ============================================================================
// Fallbacks and Headers
// ============================================================================

#[tokio::test]
async fn unknown_route_is_structured_404() {
    let app = app();
    let response = send(&app, request(Method::GET, "/api/v2/nothing", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.operation, "GET /api/v2/nothing");
}

#[tokio::test]
async fn unsupported_method_is_405() {
    let app = app();
    let response = send(&app, request(Method::PATCH, "/api/v1/todo/1", None)).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let err: ApiError = read_json(response).await;
    assert_eq!(err.code, 405);
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let app = app();
    let response = send(&app, request(Method::GET, "/api/v1/todo", None)).await;
    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let app = app();

    let response = send(
        &app,
        Request::builder()
            .uri("/api/v1/todo")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.headers().get("x-request-id").unwrap(), "abc-123");

    let response = send(&app, request(Method::GET, "/api/v1/todo/999", None)).await;
    let generated = response.headers().get("x-request-id").unwrap();
    assert!(!generated.is_empty());
}
