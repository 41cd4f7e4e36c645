//! Route handlers.
//!
//! Each handler decodes its inputs, runs one service call (two for delete)
//! on the blocking pool, and renders the item(s) or an [`ApiError`].

use super::error::{ApiError, format_operation};
use crate::models::{Item, ItemId, ItemPatch, NewItem};
use crate::observability::{current_request_context, enter_request_context};
use crate::services::TodoService;
use crate::{Error, Result};
use axum::{
    Json,
    extract::{
        OriginalUri, Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{Method, StatusCode},
};
use serde::Deserialize;

/// Body of `POST /todo`. Any `id` or `status` sent by the client is ignored.
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    #[serde(default)]
    task: String,
}

/// Query string of `GET /todo/search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

/// Runs `f` on the blocking pool inside the caller's request context and span.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let context = current_request_context();
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        let _context = context.map(enter_request_context);
        let _span = span.enter();
        f()
    })
    .await
    .map_err(|e| Error::OperationFailed {
        operation: "spawn_blocking".to_string(),
        cause: e.to_string(),
    })?
}

/// Decodes the `{id}` segment. Undecodable or absent segments are 400.
fn parse_id(
    path: std::result::Result<Path<String>, PathRejection>,
    operation: &str,
) -> std::result::Result<ItemId, ApiError> {
    let Path(raw) = path.map_err(|rejection| {
        ApiError::bad_request("invalid format of ID value", operation)
            .with_cause(rejection.body_text())
    })?;
    raw.parse::<ItemId>()
        .map_err(|e| ApiError::from_error(&e, "invalid format of ID value", operation))
}

/// `POST /todo`
pub async fn add_item(
    State(service): State<TodoService>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    body: std::result::Result<Json<CreateItemRequest>, JsonRejection>,
) -> std::result::Result<(StatusCode, Json<Item>), ApiError> {
    let operation = format_operation(&method, &uri);
    let Json(request) = body.map_err(|rejection| {
        ApiError::bad_request("failed to add a new item", &operation)
            .with_cause(rejection.body_text())
    })?;

    let item = run_blocking(move || service.add(NewItem::new(request.task)))
        .await
        .map_err(|e| ApiError::from_error(&e, "failed to add a new item", &operation))?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /todo`
pub async fn get_all_items(
    State(service): State<TodoService>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> std::result::Result<Json<Vec<Item>>, ApiError> {
    run_blocking(move || service.get_all())
        .await
        .map(Json)
        .map_err(|e| {
            ApiError::from_error(
                &e,
                "failed to retrieve all items",
                format_operation(&method, &uri),
            )
        })
}

/// `GET /todo/{id}`
pub async fn get_item(
    State(service): State<TodoService>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    path: std::result::Result<Path<String>, PathRejection>,
) -> std::result::Result<Json<Item>, ApiError> {
    let operation = format_operation(&method, &uri);
    let id = parse_id(path, &operation)?;

    run_blocking(move || service.get(id))
        .await
        .map(Json)
        .map_err(|e| {
            ApiError::from_error(&e, format!("failed to retrieve item with id {id}"), &operation)
        })
}

/// `PUT /todo/{id}`
pub async fn update_item(
    State(service): State<TodoService>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    path: std::result::Result<Path<String>, PathRejection>,
    body: std::result::Result<Json<ItemPatch>, JsonRejection>,
) -> std::result::Result<Json<Item>, ApiError> {
    let operation = format_operation(&method, &uri);
    let id = parse_id(path, &operation)?;
    let Json(patch) = body.map_err(|rejection| {
        ApiError::bad_request("invalid request format", &operation)
            .with_cause(rejection.body_text())
    })?;

    run_blocking(move || service.update(id, &patch))
        .await
        .map(Json)
        .map_err(|e| {
            ApiError::from_error(&e, format!("failed to update item with id {id}"), &operation)
        })
}

/// `DELETE /todo/{id}`
///
/// Answers with the item as it was before deletion.
pub async fn delete_item(
    State(service): State<TodoService>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    path: std::result::Result<Path<String>, PathRejection>,
) -> std::result::Result<Json<Item>, ApiError> {
    let operation = format_operation(&method, &uri);
    let id = parse_id(path, &operation)?;

    let lookup = service.clone();
    let item = run_blocking(move || lookup.get(id)).await.map_err(|e| {
        ApiError::from_error(&e, format!("failed to retrieve item with id {id}"), &operation)
    })?;

    run_blocking(move || service.delete(id))
        .await
        .map_err(|e| {
            ApiError::from_error(&e, format!("failed to delete item with id {id}"), &operation)
        })?;

    Ok(Json(item))
}

/// `GET /todo/search?q=`
pub async fn search_items(
    State(service): State<TodoService>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> std::result::Result<Json<Vec<Item>>, ApiError> {
    let operation = format_operation(&method, &uri);
    let query = params
        .map_err(|rejection| {
            ApiError::bad_request("query parameter 'q' is required", &operation)
                .with_cause(rejection.body_text())
        })?
        .0
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("query parameter 'q' is required", &operation))?;

    let message = format!("failed to search items with query {query}");
    run_blocking(move || service.search(&query))
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(&e, message, &operation))
}

/// Fallback for unknown paths.
pub async fn route_not_found(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    let operation = format_operation(&method, &uri);
    ApiError::new(StatusCode::NOT_FOUND, format!("no route for {operation}"), operation)
}

/// Fallback for known paths with an unsupported method.
pub async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    let operation = format_operation(&method, &uri);
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("method {method} not allowed on {}", uri.path()),
        operation,
    )
}
