//! Storage Insights Daemon
//!
//! Serves usage analytics over a Unix socket, merging local file records with
//! Backblaze B2 bucket listings.

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use storage_insights::catalog::MemoryCatalog;
use storage_insights::ipc::IpcServer;
use storage_insights::remote::B2Store;
use storage_insights::vault::CredentialVault;
use storage_insights::{Config, InsightsService};

fn print_help() {
    eprintln!(
        r#"Storage Insights Daemon - usage analytics for local files and B2 buckets

USAGE:
    storage-insights-daemon          # Run IPC server (default)
    storage-insights-daemon help

ENVIRONMENT:
    INSIGHTS_SOCKET_PATH              Unix socket path (default /tmp/storage-insights.sock)
    INSIGHTS_CATALOG_PATH             JSON manifest of local file/folder records
    INSIGHTS_CAPACITY_BYTES           Capacity reported per principal
    INSIGHTS_CREDENTIAL_TTL_SECS      Credential lifetime (default 86400)
    INSIGHTS_SWEEP_INTERVAL_SECS      Credential sweep interval (default 3600)
    INSIGHTS_REPORT_TTL_SECS          Usage report cache TTL (default 600)
    INSIGHTS_REPORT_OBJECT_CEILING    Remote objects per usage report (default 50000)
    INSIGHTS_STATS_OBJECT_CEILING     Remote objects per stats summary (default 100000)
    INSIGHTS_PAGE_SIZE                Objects per listing page (default 1000)
    INSIGHTS_COMPUTE_TIMEOUT_SECS     Deadline per report/stats call (default 60)
    RUST_LOG                          Log level (trace, debug, info, warn, error)
"#
    );
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() -> Result<()> {
    let mut terminate = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl+C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let log_level = env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(arg) = env::args().nth(1) {
        match arg.as_str() {
            "help" | "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown command: {}", other);
                print_help();
                std::process::exit(1);
            }
        }
    }

    let config = Config::from_env();
    info!(
        socket = %config.socket_path.display(),
        catalog = %config.catalog_path.display(),
        "Starting Storage Insights daemon"
    );

    let catalog = MemoryCatalog::load(&config.catalog_path)
        .await
        .context("Failed to load catalog manifest")?;
    let store = B2Store::new().context("Failed to create B2 transport")?;

    let vault = Arc::new(CredentialVault::new(config.credential_ttl));
    vault.start_sweeper(config.sweep_interval);

    let service = Arc::new(InsightsService::new(
        Arc::new(catalog),
        Arc::new(store),
        Arc::clone(&vault),
        &config,
    ));

    let mut ipc_server = IpcServer::new(Arc::clone(&service), config.socket_path.clone());
    if let Err(e) = ipc_server.start().await {
        error!(error = %e, "Failed to start IPC server");
        return Err(e);
    }
    let ipc_server = Arc::new(ipc_server);

    let running = Arc::clone(&ipc_server);
    let ipc_handle = tokio::spawn(async move {
        if let Err(e) = running.run().await {
            error!(error = %e, "IPC server error");
        }
    });

    info!("Daemon ready. Waiting for commands...");

    // Credentials are cleared even if signal handling failed
    match shutdown_signal().await {
        Ok(()) => info!("Received shutdown signal, clearing credentials..."),
        Err(e) => error!(error = %e, "Signal handling failed, shutting down"),
    }
    ipc_handle.abort();
    service.shutdown();
    if let Err(e) = ipc_server.stop() {
        error!(error = %e, "Failed to clean up IPC socket");
    }

    info!("Shutdown complete.");
    Ok(())
}
