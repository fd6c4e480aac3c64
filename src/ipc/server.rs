//! IPC Server - Unix socket server for local clients
//!
//! Handles incoming connections and dispatches commands to the
//! `InsightsService`.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

use crate::errors::InsightsError;
use crate::insights::ReportOptions;
use crate::ipc::protocol::{
    parse_command, serialize_response, Command, Response, PROTOCOL_VERSION,
};
use crate::service::InsightsService;

/// IPC Server that listens for commands from local clients
pub struct IpcServer {
    service: Arc<InsightsService>,
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    /// Active connections counter
    connection_count: Arc<AtomicU32>,
}

impl IpcServer {
    pub fn new(service: Arc<InsightsService>, socket_path: PathBuf) -> Self {
        Self {
            service,
            socket_path,
            listener: None,
            connection_count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Bind the socket
    pub async fn start(&mut self) -> Result<()> {
        // Clean up any existing socket file
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)
                .context("Failed to remove existing socket file")?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .context("Failed to bind Unix socket")?;

        info!(socket_path = %self.socket_path.display(), "IPC server started");

        self.listener = Some(listener);
        Ok(())
    }

    /// Run the server loop, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("Server not started")?;

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let service = Arc::clone(&self.service);
                    let connection_count = Arc::clone(&self.connection_count);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, service, connection_count).await {
                            error!(error = %e, "Connection handler error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    /// Remove the socket file
    pub fn stop(&self) -> Result<()> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).context("Failed to remove socket file")?;
        }
        info!("IPC server stopped");
        Ok(())
    }

    pub fn connection_count(&self) -> u32 {
        self.connection_count.load(Ordering::Relaxed)
    }
}

/// Handle a single client connection
async fn handle_connection(
    stream: UnixStream,
    service: Arc<InsightsService>,
    connection_count: Arc<AtomicU32>,
) -> Result<()> {
    let count = connection_count.fetch_add(1, Ordering::Relaxed) + 1;
    debug!(count = count, "New connection");

    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();

    // Read commands line by line (newline-delimited JSON)
    loop {
        line.clear();
        match buf_reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("Connection closed by client");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let response = match parse_command(trimmed.as_bytes()) {
                    Ok(command) => process_command(command, &service).await,
                    Err(e) => {
                        // The raw line may carry a secret, so it is not logged
                        warn!(error = %e, "Failed to parse command");
                        Response::Error {
                            error: format!("Invalid command: {}", e),
                            code: Some("invalid_command".to_string()),
                        }
                    }
                };

                match serialize_response(&response) {
                    Ok(json) => {
                        if let Err(e) = writer.write_all(&json).await {
                            error!(error = %e, "Failed to write response");
                            break;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to serialize response");
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to read from socket");
                break;
            }
        }
    }

    let count = connection_count
        .fetch_sub(1, Ordering::Relaxed)
        .saturating_sub(1);
    debug!(count = count, "Connection ended");

    Ok(())
}

fn error_response(e: InsightsError) -> Response {
    Response::Error {
        code: Some(e.code().to_string()),
        error: e.to_string(),
    }
}

/// Process a command and return a response
pub async fn process_command(command: Command, service: &InsightsService) -> Response {
    match command {
        Command::Connect {
            principal,
            credential,
        } => {
            info!(principal = %principal, "Processing connect command");
            match service.connect(&principal, credential).await {
                Ok(buckets) => Response::Connection {
                    version: PROTOCOL_VERSION,
                    connected: true,
                    buckets,
                },
                Err(e) => error_response(e),
            }
        }

        Command::Disconnect { principal } => {
            info!(principal = %principal, "Processing disconnect command");
            let existed = service.disconnect(&principal);
            Response::Success {
                message: Some(if existed {
                    "Disconnected".to_string()
                } else {
                    "Not connected".to_string()
                }),
            }
        }

        Command::Status { principal } => {
            debug!(principal = %principal, "Processing status command");
            Response::Connection {
                version: PROTOCOL_VERSION,
                connected: service.is_connected(&principal),
                buckets: Vec::new(),
            }
        }

        Command::GetAnalytics {
            principal,
            force_refresh,
            include_external,
        } => {
            debug!(principal = %principal, force_refresh, include_external, "Processing getAnalytics command");
            let options = ReportOptions {
                force_refresh,
                include_external,
            };
            match service.analytics(&principal, options).await {
                Ok(report) => Response::Analytics {
                    report: report.as_ref().clone(),
                },
                Err(e) => {
                    error!(principal = %principal, error = %e, "Usage report failed");
                    error_response(e)
                }
            }
        }

        Command::GetStats { principal } => {
            debug!(principal = %principal, "Processing getStats command");
            match service.stats(&principal).await {
                Ok(stats) => Response::Stats { stats },
                Err(e) => {
                    error!(principal = %principal, error = %e, "Stats summary failed");
                    error_response(e)
                }
            }
        }
    }
}
