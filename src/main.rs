//! Binary entry point for todo-app.
//!
//! This binary serves the to-do HTTP API and offers a couple of operational
//! helpers around its configuration and storage backend.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use todo_app::observability;
use todo_app::{ApiServer, BackendFactory, ItemStore, StoreBackend, TodoConfig, TodoService};

/// todo-app - A small CRUD web service for to-do items.
#[derive(Parser)]
#[command(name = "todo-app")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Load variables from this file instead of `./.env`.
    #[arg(long, global = true, env = "TODO_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API (default).
    Serve {
        /// Bind host (overrides `API_SERVER_HOST`).
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides `API_SERVER_PORT`).
        #[arg(short, long)]
        port: Option<u16>,

        /// Storage backend: memory, sqlite or postgres (overrides `TODO_STORE_BACKEND`).
        #[arg(short, long)]
        backend: Option<StoreBackend>,
    },

    /// Open and verify the configured storage backend, then exit.
    Check,

    /// Print the resolved configuration.
    Config,
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Environment files are applied before the runtime starts any threads.
    if let Err(e) = load_env_file(cli.env_file.as_deref()) {
        eprintln!("Failed to load environment file: {e:#}");
        return ExitCode::FAILURE;
    }

    let mut config = match TodoConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let command = cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
        backend: None,
    });

    if let Commands::Serve {
        host,
        port,
        backend,
    } = &command
    {
        apply_overrides(&mut config, host.clone(), *port, *backend);
    }

    if matches!(command, Commands::Config) {
        println!("{config}");
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        },
    };

    let result = runtime.block_on(async {
        // Metrics are only exposed while serving.
        let mut metrics = config.metrics;
        metrics.enabled &= matches!(command, Commands::Serve { .. });
        let _observability = observability::init(&config.logging, &metrics, cli.verbose)
            .context("failed to initialize observability")?;

        match command {
            Commands::Serve { .. } => cmd_serve(config).await,
            Commands::Check => cmd_check(config).await,
            Commands::Config => Ok(()),
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads `path`, or `./.env` when present.
fn load_env_file(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| format!("{}", path.display()))?;
        },
        None => {
            let _ = dotenvy::dotenv();
        },
    }
    Ok(())
}

fn apply_overrides(
    config: &mut TodoConfig,
    host: Option<String>,
    port: Option<u16>,
    backend: Option<StoreBackend>,
) {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(backend) = backend {
        config.store.backend = backend;
    }
}

/// Opens the store and checks it is usable.
async fn open_store(store: &Arc<dyn ItemStore>) -> Result<()> {
    let opener = Arc::clone(store);
    let backend = store.backend_name();
    tokio::task::spawn_blocking(move || {
        opener.open()?;
        opener.verify_connection()
    })
    .await
    .context("store open task panicked")?
    .with_context(|| format!("failed to open {backend} store"))
}

/// Releases the store's resources.
async fn close_store(store: Arc<dyn ItemStore>) -> Result<()> {
    let backend = store.backend_name();
    tokio::task::spawn_blocking(move || store.close())
        .await
        .context("store close task panicked")?
        .with_context(|| format!("failed to close {backend} store"))
}

/// Serves the API until SIGINT/SIGTERM.
async fn cmd_serve(config: TodoConfig) -> Result<()> {
    let store = BackendFactory::create(&config.store).context("invalid storage configuration")?;
    open_store(&store).await?;
    tracing::info!(backend = store.backend_name(), "storage backend ready");

    let address = config.server.bind_address();
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            let _ = close_store(store).await;
            return Err(e).with_context(|| format!("failed to bind {address}"));
        },
    };

    let server = ApiServer::new(TodoService::new(Arc::clone(&store)));
    let notify = Arc::new(Notify::new());
    let trigger = Arc::clone(&notify);
    let mut server_task =
        tokio::spawn(server.serve(listener, async move { trigger.notified().await }));

    let outcome = tokio::select! {
        joined = &mut server_task => flatten(joined),
        () = shutdown_signal() => {
            tracing::info!(
                timeout_secs = config.server.shutdown_timeout.as_secs(),
                "shutdown requested, draining connections"
            );
            notify.notify_one();
            drain(&mut server_task, config.server.shutdown_timeout).await
        },
    };

    let closed = close_store(store).await;
    outcome.and(closed)
}

/// Waits up to `deadline` for the server task to finish.
async fn drain(
    server_task: &mut tokio::task::JoinHandle<todo_app::Result<()>>,
    deadline: Duration,
) -> Result<()> {
    if let Ok(joined) = tokio::time::timeout(deadline, &mut *server_task).await {
        flatten(joined)
    } else {
        tracing::warn!("shutdown deadline passed, aborting in-flight requests");
        server_task.abort();
        Ok(())
    }
}

fn flatten(joined: Result<todo_app::Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined
        .context("server task panicked")?
        .context("http server failed")
}

/// Opens, verifies and closes the configured store.
async fn cmd_check(config: TodoConfig) -> Result<()> {
    let store = BackendFactory::create(&config.store).context("invalid storage configuration")?;
    open_store(&store).await?;
    let backend = store.backend_name();
    close_store(store).await?;
    println!("{backend} store is reachable");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
