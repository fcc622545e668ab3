//! Headless shell for the live tally monitor.
//!
//! Loads a monitor configuration, runs the engine on its own thread, and
//! mirrors engine events to the log until interrupted.

mod pattern;

use std::fs;
use std::thread;

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};

use livetally_engine::Engine;
use livetally_ipc::{EngineCommand, EngineEvent, MonitorConfig};

use crate::pattern::ColorBars;

fn load_config() -> Result<MonitorConfig> {
    let Some(path) = std::env::args().nth(1) else {
        bail!("Usage: livetally <config.json>");
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {path}"))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {path}"))?;
    Ok(config)
}

fn log_event(event: EngineEvent) {
    match event {
        EngineEvent::Ready => info!("Engine ready"),
        EngineEvent::StateChanged { previous, current } => {
            info!(
                previous = %previous.name(),
                current = %current.name(),
                "Engine state changed"
            );
        }
        EngineEvent::Status(status) => {
            if status.is_live {
                info!(
                    viewers = status.viewer_count,
                    title = %status.title,
                    video_id = %status.live_video_id,
                    "Channel is LIVE"
                );
            } else {
                info!("Channel is not live");
            }
        }
        EngineEvent::StatusError { kind, message } => {
            warn!(?kind, "Status poll failed: {}", message);
        }
        EngineEvent::Shutdown => {}
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = load_config()?;
    info!(channel = %config.channel, "Starting live tally monitor");

    // Create IPC channels
    let (command_tx, command_rx) = livetally_ipc::command_channel();
    let (event_tx, event_rx) = livetally_ipc::event_channel();

    // Spawn engine thread
    let engine_thread = thread::spawn(move || {
        info!("Engine thread starting");
        match Engine::new(command_rx, event_tx, Box::new(ColorBars::new())) {
            Ok(mut engine) => engine.run(),
            Err(e) => error!("Failed to create engine: {}", e),
        }
        info!("Engine thread stopped");
    });

    command_tx
        .send(EngineCommand::Start { config })
        .context("Engine command channel closed")?;

    // Ctrl-C turns into a clean engine shutdown
    let shutdown_tx = command_tx.clone();
    thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Signal handler unavailable: {}", e);
                return;
            }
        };

        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(EngineCommand::Shutdown);
        }
    });

    for event in event_rx.iter() {
        match event {
            EngineEvent::Shutdown => break,
            event => log_event(event),
        }
    }

    let _ = engine_thread.join();
    info!("Monitor exited");
    Ok(())
}
