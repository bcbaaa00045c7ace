//! Hookbridge - Lua scripting bridge demo host
//!
//! Runs a simulated world loop with the scripting engines attached. Lines
//! typed on stdin are handled as console commands.

mod host;
mod reloader;
mod world;

use std::time::{Duration, Instant};

use hookbridge_config::EngineConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::reloader::ScriptReloader;
use crate::world::World;

/// World update interval
const TICK: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Hookbridge starting up...");

    let config = match EngineConfig::load_default() {
        Ok(config) => {
            info!("Configuration loaded from {}", hookbridge_config::DEFAULT_CONFIG_PATH);
            config
        }
        Err(e) => {
            warn!("Failed to load {}: {}", hookbridge_config::DEFAULT_CONFIG_PATH, e);
            warn!("Using default configuration");
            EngineConfig::default()
        }
    };
    config.display();

    let reloader = if config.enabled && config.script_reloader {
        match ScriptReloader::new(&config.resolved_script_path()) {
            Ok(reloader) => Some(reloader),
            Err(e) => {
                warn!("Script reloader disabled: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let mut world = World::new(config)?;
    world.start();
    info!("World is running, press Ctrl+C to stop");

    let mut interval = tokio::time::interval(TICK);
    let mut last_tick = Instant::now();
    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let diff = u32::try_from(now.duration_since(last_tick).as_millis()).unwrap_or(u32::MAX);
                last_tick = now;

                world.tick(diff);
                if reloader.as_ref().map_or(false, ScriptReloader::has_changes) {
                    world.reload();
                }
            }
            line = console.next_line(), if console_open => match line {
                Ok(Some(line)) => world.console_command(line.trim()),
                Ok(None) => console_open = false,
                Err(e) => {
                    error!("Console read failed: {}", e);
                    console_open = false;
                }
            },
            _ = &mut shutdown => break,
        }
    }

    info!("Shutting down...");
    world.shutdown();
    info!("Goodbye");
    Ok(())
}
