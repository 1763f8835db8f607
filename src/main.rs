//! # Telemetry Link
//!
//! Runs one end of the half-duplex telemetry link: the flight computer that
//! samples and transmits telemetry, or the ground receiver that decodes it.
//!
//! Usage: `telemetry-link [config.toml]`
//!
//! Console requests (`K<code>`) are read from stdin and answered on stdout.
//! Logs go to stderr; set `RUST_LOG` to adjust the level.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

use telemetry_link::config::Config;
use telemetry_link::link::{RadioLink, SerialTransceiver};
use telemetry_link::node::Node;
use telemetry_link::scheduler::{Clock, MonotonicClock};
use telemetry_link::sensors::SimulatedSensors;

/// Console lines buffered between stdin and the node
const CONSOLE_QUEUE_DEPTH: usize = 32;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // stdout carries the console protocol, so logs go to stderr
    let (log_writer, _log_guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_writer(log_writer)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Telemetry Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("Failed to load config {}", path))?,
        None => {
            info!("No config file given, using defaults");
            Config::default()
        }
    };
    info!("Running as {:?} node", config.node.role);

    // No radio, no node: startup failure is fatal
    let radio = SerialTransceiver::open(&config.radio).context("Radio initialization failed")?;
    info!("Radio bridge opened at: {}", radio.device_path());
    let link = RadioLink::new(radio, &config.radio)
        .await
        .context("Radio refused to enter receive mode")?;

    let (line_tx, line_rx) = mpsc::channel(CONSOLE_QUEUE_DEPTH);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).await.is_err() {
                break;
            }
        }
        debug!("Console input closed");
    });

    let mut node = Node::new(
        &config,
        link,
        SimulatedSensors::new(),
        line_rx,
        Box::new(std::io::stdout()),
    );
    node.start();

    let clock = MonotonicClock::new();
    let mut ticker = interval(Duration::from_millis(config.node.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Scheduler running with {} tasks", node.scheduler().tasks().len());
    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                node.step(clock.now_ms()).await;
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    Ok(())
}
