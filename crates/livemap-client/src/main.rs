//! Headless live presence map client.
//!
//! Joins the realtime channel over NATS, keeps a headless map in sync with
//! every participant's position, and takes commands on stdin: location
//! fixes for this device, camera and style operations, geocoding and
//! routes to other participants.
//!
//! # Architecture
//!
//! ```text
//! NATS --> RealtimeChannel --> MapController <-- console (stdin)
//!                                   |
//!                                   +--> Nominatim / BRouter (HTTP)
//! ```

mod console;
mod error;
mod session;

use std::path::Path;
use std::sync::Arc;

use livemap_channel::{NatsTransport, RealtimeChannel};
use livemap_core::{BroadcastSensor, HeadlessMapFactory, LiveMapConfig, MapContainer, MapController};
use livemap_geo::GeoService;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ClientError;
use crate::session::Session;

const DEFAULT_CONFIG_PATH: &str = "livemap.yaml";

/// Load `LIVEMAP_CONFIG`, or `livemap.yaml` when present, or defaults.
fn load_config() -> Result<LiveMapConfig, ClientError> {
    match std::env::var("LIVEMAP_CONFIG") {
        Ok(path) => Ok(LiveMapConfig::from_file(Path::new(&path))?),
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Ok(LiveMapConfig::from_file(Path::new(DEFAULT_CONFIG_PATH))?)
        }
        Err(_) => Ok(LiveMapConfig::from_env()),
    }
}

/// Application entry point.
///
/// Loads configuration, initializes logging, connects to NATS, creates the
/// map and serves console commands until `quit` or end of input.
///
/// # Errors
///
/// Returns an error if configuration, the NATS connection or console I/O
/// fails.
#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let config = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        nats_url = config.realtime.nats_url,
        subject_prefix = config.realtime.subject_prefix,
        geocoder_url = config.geo.geocoder_url,
        router_url = config.geo.router_url,
        "livemap-client starting"
    );

    let (transport, inbound) =
        NatsTransport::connect(&config.realtime.nats_url, &config.realtime.subject_prefix).await?;
    let channel = RealtimeChannel::new(transport);
    let geo = GeoService::new(config.geo.clone())?;
    let sensor = Arc::new(BroadcastSensor::default());

    let mut controller = MapController::new(
        config.map.clone(),
        channel.clone(),
        geo,
        Arc::new(HeadlessMapFactory::new()),
        sensor.clone(),
    );
    // Handlers must be registered before the pump delivers `connected`.
    controller.init(&MapContainer::new("console"));
    let pump = channel.pump(inbound);

    let mut session = Session::new(controller, sensor);
    info!("map ready, reading commands from stdin (try `help`)");
    let result = session
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await;

    session.shutdown();
    channel.disconnect();
    pump.abort();
    info!("livemap-client stopped");
    result
}
