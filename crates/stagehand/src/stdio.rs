//! Stdio MCP transport.
//!
//! The virtual MIDI port lives exactly as long as the session: it is opened
//! before the first request and closed when the session ends or a stop
//! signal arrives.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use stageconf::StageConfig;
use tracing::{info, warn};

use crate::actuator::Actuator;
use crate::backend::WalkerBackend;
use crate::midi::MidiSink;
use crate::server::StagehandServer;

/// Run the MCP server over stdin/stdout until the client disconnects or the
/// process is asked to stop.
pub async fn run(config: StageConfig, config_path: Option<PathBuf>) -> Result<()> {
    let midi = Arc::new(MidiSink::new(config.midi.port_name.clone()));
    if let Err(e) = midi.open() {
        // The extraction and automation tools still work without MIDI.
        warn!("MIDI tools disabled: {}", e);
    }

    let walker = Arc::new(WalkerBackend::from_config(&config, config_path.clone()));
    let server = StagehandServer::new(
        &config,
        crate::coordinator(&config, config_path),
        walker,
        Actuator::from_config(&config),
        Arc::clone(&midi),
    );

    let service = server
        .serve(stdio())
        .await
        .context("Failed to start stdio MCP service")?;

    info!(host = %config.host.app_name, "Stdio MCP server running");

    let token = service.cancellation_token();
    let result = until_shutdown(service.waiting(), move || token.cancel(), shutdown_signal()).await;

    midi.close();
    info!(messages = midi.messages_sent(), "Stdio MCP server shutdown");
    result?;
    Ok(())
}

/// Drive `session` to its end. If `shutdown` fires first, `cancel` is called
/// and the session is still awaited so its task can wind down.
async fn until_shutdown<T>(
    session: impl Future<Output = T>,
    cancel: impl FnOnce(),
    shutdown: impl Future<Output = ()>,
) -> T {
    tokio::pin!(session);
    tokio::select! {
        out = &mut session => out,
        _ = shutdown => {
            cancel();
            session.await
        }
    }
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                match signal(SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        warn!("SIGTERM handler unavailable: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
