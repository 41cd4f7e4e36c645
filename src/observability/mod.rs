//! Observability and telemetry.
//!
//! - Logging: `tracing` with a `tracing-subscriber` fmt layer
//! - Metrics: `metrics` facade with an optional Prometheus exporter
//! - Request context: correlation ids that follow a request onto the
//!   blocking pool

mod logging;
mod metrics;
mod request_context;

pub use logging::{LogFormat, LoggingConfig};
pub use metrics::{MetricsConfig, install_prometheus};
pub use request_context::{
    RequestContext, RequestContextGuard, current_request_context, current_request_id,
    enter_request_context, scope_request_context,
};

use crate::{Error, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::OnceLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Handle for observability runtime components.
pub struct ObservabilityHandle {
    metrics_handle: Option<PrometheusHandle>,
}

impl ObservabilityHandle {
    /// Returns the Prometheus handle when the exporter is installed.
    #[must_use]
    pub const fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics_handle.as_ref()
    }
}

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Initializes logging and metrics for the process.
///
/// # Errors
///
/// Returns an error if observability has already been initialized, the log
/// filter does not parse, or the metrics exporter cannot be installed.
pub fn init(
    logging: &LoggingConfig,
    metrics: &MetricsConfig,
    verbose: bool,
) -> Result<ObservabilityHandle> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(init_error("observability already initialized"));
    }

    let filter = logging.env_filter(verbose)?;

    match logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .with(filter)
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().compact().with_target(true))
            .with(filter)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .with(filter)
            .try_init(),
    }
    .map_err(init_error)?;

    let metrics_handle = install_prometheus(metrics)?;

    OBSERVABILITY_INIT
        .set(())
        .map_err(|()| init_error("failed to mark observability initialized"))?;

    Ok(ObservabilityHandle { metrics_handle })
}

fn init_error(cause: impl std::fmt::Display) -> Error {
    Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: cause.to_string(),
    }
}
