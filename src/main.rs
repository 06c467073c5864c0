//! Groundlink server binary
//!
//! Wires the live store, correlator, persistence sink, WebSocket hub,
//! and ingest pipeline together, then serves the HTTP API until a
//! shutdown signal arrives.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use groundlink::api::{self, ApiConfig, AppState};
use groundlink::config::{generate_default_config, Config};
use groundlink::correlate::{CorrelatorConfig, EventCorrelator};
use groundlink::ingest::IngestPipeline;
use groundlink::persist::{EventSink, EventStore, JsonlEventStore};
use groundlink::telemetry::{LiveStore, MessageKey, SchemaRegistry};
use groundlink::websocket::{ConnectionHub, HubConfig};

#[derive(Parser, Debug)]
#[command(name = "groundlink")]
#[command(about = "Telemetry correlation and fan-out engine")]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a default config file to stdout and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::load_default(),
    };

    init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        trigger_key = config.correlation.trigger_key,
        event_file = %config.persistence.event_file,
        "Starting groundlink"
    );

    // Core state
    let store = Arc::new(LiveStore::new());
    let registry = SchemaRegistry::with_defaults();

    // Each run is a fresh session: opening truncates the event file
    let events = Arc::new(
        JsonlEventStore::open(&config.persistence.event_file)
            .await
            .context("Failed to open capture event store")?,
    );

    let sink = EventSink::new(
        Arc::clone(&events) as Arc<dyn EventStore>,
        config.persistence.queue_capacity,
    );
    let (sink_handle, _sink_task) = sink.spawn();

    let hub = Arc::new(ConnectionHub::new(HubConfig {
        max_connections: config.websocket.max_connections,
        send_buffer: config.websocket.send_buffer,
    }));

    let correlator = EventCorrelator::new(CorrelatorConfig {
        trigger_key: MessageKey(config.correlation.trigger_key),
        dependents: vec![
            (
                "orientation".to_string(),
                MessageKey(config.correlation.orientation_key),
            ),
            (
                "system_time".to_string(),
                MessageKey(config.correlation.system_time_key),
            ),
        ],
        derived_time_field: "capture_time_iso".to_string(),
        clock_key: MessageKey(config.correlation.clock_key),
        clock_field: config.correlation.clock_field.clone(),
    });

    let (ingest_tx, ingest_rx) = mpsc::channel(config.ingest.channel_capacity);
    let pipeline = IngestPipeline::new(
        registry,
        Arc::clone(&store),
        correlator,
        sink_handle,
        Arc::clone(&hub),
    );
    let _pipeline_task = pipeline.spawn(ingest_rx);

    let api_config = ApiConfig {
        host: config.api.host.clone(),
        port: config.api.port,
    };
    let state = AppState::new(
        store,
        events as Arc<dyn EventStore>,
        hub,
        ingest_tx,
        api_config.clone(),
    );

    api::serve(state, &api_config)
        .await
        .context("API server failed")?;

    Ok(())
}

fn init_logging(config: &Config) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}
