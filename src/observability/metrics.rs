//! Prometheus metrics exporter.

use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::{Ipv4Addr, SocketAddr};

/// Metrics configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether to install the exporter at all.
    pub enabled: bool,
    /// Port of the `/metrics` HTTP listener.
    pub port: u16,
}

impl MetricsConfig {
    /// Default exporter port.
    pub const DEFAULT_PORT: u16 = 9090;

    /// Returns the exporter listen address.
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: Self::DEFAULT_PORT,
        }
    }
}

/// Installs the Prometheus recorder and its HTTP listener.
///
/// Without a running tokio runtime only the recorder is installed; the
/// returned handle can still render the exposition text.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if a global recorder is already set or
/// the listener cannot be built.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let builder = PrometheusBuilder::new();
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::warn!("no tokio runtime, metrics exporter listener disabled");
        return builder
            .install_recorder()
            .map(Some)
            .map_err(|e| install_error("metrics_recorder_install", e));
    };

    let (recorder, exporter) = {
        let _guard = runtime.enter();
        builder
            .with_http_listener(config.listen_addr())
            .build()
            .map_err(|e| install_error("metrics_exporter_build", e))?
    };
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| install_error("metrics_recorder_install", e))?;
    runtime.spawn(exporter);

    tracing::info!(addr = %config.listen_addr(), "prometheus exporter listening");
    Ok(Some(handle))
}

fn install_error(operation: &str, e: impl std::fmt::Display) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}
