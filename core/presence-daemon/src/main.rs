//! resolve-presence entrypoint.
//!
//! Mirrors the state of a running DaVinci Resolve instance (current page,
//! timeline, render progress) into Discord Rich Presence, and clears the
//! status on the way out. Stops on SIGINT/SIGTERM or when Resolve closes.

mod discord;
mod resolve;

use clap::Parser;
use presence_core::{PresenceConfig, ShutdownSignal, Supervisor};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use std::env;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use discord::DiscordIpcClient;
use resolve::{BridgeCommand, ResolveBridge};

const DEBUG_LOG_ENV: &str = "RESOLVE_PRESENCE_DEBUG_LOG";

#[derive(Parser)]
#[command(name = "resolve-presence")]
#[command(about = "DaVinci Resolve status for Discord Rich Presence")]
#[command(version)]
struct Cli {}

fn main() -> ExitCode {
    let _cli = Cli::parse();
    init_logging();

    let shutdown = ShutdownSignal::new();
    if let Err(err) = register_signal_handlers(&shutdown) {
        warn!(error = %err, "Failed to register signal handlers; Ctrl+C will not clear status");
    }

    let config = PresenceConfig::default();
    let presence = DiscordIpcClient::new(&config.client_id);
    let host = ResolveBridge::new(BridgeCommand::from_env());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "DaVinci Resolve presence bridge starting"
    );
    let reason = Supervisor::new(config, host, presence, shutdown).run();
    ExitCode::from(reason.exit_code())
}

/// Signals only set the shutdown flag; the supervisor does the cleanup at
/// its next safe point. Repeated signals are absorbed, so a blocked host or
/// presence call finishes (bounded by its timeout) before cleanup runs.
fn register_signal_handlers(shutdown: &ShutdownSignal) -> std::io::Result<()> {
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, shutdown.flag())?;
    }
    Ok(())
}

fn init_logging() {
    let debug_enabled = env::var(DEBUG_LOG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
