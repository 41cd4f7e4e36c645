//! HTTP server.

use super::handlers;
use crate::observability::{RequestContext, scope_request_context};
use crate::services::TodoService;
use crate::{Error, Result};
use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, header},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Path prefix of every API route.
pub const API_PREFIX: &str = "/api/v1";

/// Correlation header accepted from clients and echoed on responses.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The to-do HTTP API.
///
/// | Method & Path | Success |
/// |---------------|---------|
/// | `POST /api/v1/todo` | 201 + created item |
/// | `GET /api/v1/todo` | 200 + all items |
/// | `GET /api/v1/todo/search?q=` | 200 + matching items |
/// | `GET /api/v1/todo/{id}` | 200 + item |
/// | `PUT /api/v1/todo/{id}` | 200 + updated item |
/// | `DELETE /api/v1/todo/{id}` | 200 + deleted item |
#[derive(Clone)]
pub struct ApiServer {
    service: TodoService,
}

impl ApiServer {
    /// Creates a server over `service`.
    #[must_use]
    pub const fn new(service: TodoService) -> Self {
        Self { service }
    }

    /// Builds the router with all middleware applied.
    pub fn router(&self) -> Router {
        let todo = Router::new()
            .route("/todo", get(handlers::get_all_items).post(handlers::add_item))
            // PUT and DELETE on `search` fall through to the id handlers,
            // which reject the segment as a malformed id.
            .route(
                "/todo/search",
                get(handlers::search_items)
                    .put(handlers::update_item)
                    .delete(handlers::delete_item),
            )
            .route(
                "/todo/{id}",
                get(handlers::get_item)
                    .put(handlers::update_item)
                    .delete(handlers::delete_item),
            )
            .method_not_allowed_fallback(handlers::method_not_allowed);

        Router::new()
            .nest(API_PREFIX, todo)
            .fallback(handlers::route_not_found)
            .with_state(self.service.clone())
            // Security headers
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            ))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(&X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }))
            .layer(middleware::from_fn(propagate_request_id))
    }

    /// Serves on `listener` until `shutdown` resolves, then stops accepting
    /// connections and waits for in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the accept loop fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, prefix = API_PREFIX, "http server listening");
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::OperationFailed {
                operation: "serve".to_string(),
                cause: e.to_string(),
            })?;

        tracing::info!("http server stopped");
        Ok(())
    }
}

/// Scopes a [`RequestContext`] around the request and echoes its id.
///
/// A missing or unusable `x-request-id` is replaced with a generated one
/// before inner layers see the request.
async fn propagate_request_id(mut request: Request, next: Next) -> Response {
    let context = RequestContext::from_header(
        request
            .headers()
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok()),
    );
    let header_value = HeaderValue::from_str(context.request_id()).ok();
    if let Some(value) = &header_value {
        request.headers_mut().insert(X_REQUEST_ID.clone(), value.clone());
    }

    let mut response = scope_request_context(context, next.run(request)).await;
    if let Some(value) = header_value {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}
