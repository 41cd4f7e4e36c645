//! HTTP transport.
//!
//! Thin axum layer over [`TodoService`](crate::services::TodoService):
//! decode, dispatch on the blocking pool, encode. Error kinds map to status
//! codes in [`status_for`].

mod error;
mod handlers;
mod server;

pub use error::{ApiError, format_operation, status_for};
pub use server::{API_PREFIX, ApiServer, X_REQUEST_ID};
