/*!
Leafguard dashboard session runner.

Drives one dashboard session from the command line: optional one-shot
image analysis and manual spray on startup, then a telemetry polling
loop until ctrl-c, with an optional history export on shutdown.
*/

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Arg, Command};
use tokio_stream::StreamExt;
use tracing::{info, warn};

use leafguard_store::ExportFormat;

mod core;

use crate::core::client::HttpBackendClient;
use crate::core::config;
use crate::core::session::SessionContext;
use crate::core::telemetry::{SimulatedSensorSource, TelemetryEvent, TelemetryPoller};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let matches = Command::new("Leafguard Dashboard")
        .version("0.1.0")
        .about("Plant disease detection and spray control session runner")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to a TOML configuration file")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("backend-url")
                .short('b')
                .long("backend-url")
                .help("Backend base URL (overrides the config file)")
                .value_name("URL"),
        )
        .arg(
            Arg::new("image")
                .short('i')
                .long("image")
                .help("Leaf image to classify on startup")
                .value_name("PATH"),
        )
        .arg(
            Arg::new("spray")
                .short('s')
                .long("spray")
                .help("Dispatch a manual spray of this many milliliters on startup")
                .value_name("ML"),
        )
        .arg(
            Arg::new("export")
                .short('e')
                .long("export")
                .help("Export the detection history on shutdown (csv or json)")
                .value_name("FORMAT"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Export file path, without extension")
                .value_name("PATH")
                .default_value("./leafguard_history"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut config = config::load_config(config_path.as_deref()).await?;
    if let Some(url) = matches.get_one::<String>("backend-url") {
        config.backend.base_url = url.clone();
    }

    // Reject a bad export format now rather than after the session ends.
    let export_format: Option<ExportFormat> = match matches.get_one::<String>("export") {
        Some(format) => Some(format.parse()?),
        None => None,
    };

    let client = Arc::new(HttpBackendClient::new(&config.backend)?);
    let mut session = SessionContext::new(client);

    for (device, state) in session.devices().snapshot() {
        info!("📟 {}: {:?}", device.label(), state);
    }

    if let Some(path) = matches.get_one::<String>("image") {
        analyze(&mut session, Path::new(path)).await?;
    }

    if let Some(ml) = matches.get_one::<String>("spray") {
        let amount_ml: f64 = ml.parse()?;
        match session.dispatch_spray(amount_ml).await {
            Ok(event) => info!("💧 Sprayed {} ml of pesticide", event.pesticide_amount_ml),
            Err(e) => warn!("Could not reach the spray controller: {}", e),
        }
    }

    let source = SimulatedSensorSource::new(config.telemetry.clone());
    let mut poller = TelemetryPoller::new(Box::new(source), config.telemetry.poll_interval_ms);
    let stream = poller.start().await;
    tokio::pin!(stream);

    info!("🚀 Dashboard session running; press ctrl-c to stop");
    loop {
        tokio::select! {
            event = stream.next() => {
                match event {
                    Some(TelemetryEvent::Reading(reading)) => {
                        let reading = session.record_reading(reading);
                        info!(
                            "🌡 {:.1}°C  💧 {:.1}%  🌱 {:.1}%  pH {:.1}",
                            reading.temperature,
                            reading.humidity,
                            reading.soil_moisture,
                            reading.ph_level
                        );
                    }
                    Some(TelemetryEvent::SourceError(e)) => {
                        warn!("Sensor source error: {}", e);
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Shutdown");
                break;
            }
        }
    }

    if let Some(format) = export_format {
        let bytes = session.log().export(format.file_extension())?;
        let output = matches
            .get_one::<String>("output")
            .map(String::as_str)
            .unwrap_or("./leafguard_history");
        let path = format!("{}.{}", output, format.file_extension());
        tokio::fs::write(&path, bytes).await?;
        info!(
            "Exported {} detection events to {}",
            session.log().detection_count(),
            path
        );
    }

    Ok(())
}

/// Classify one image and, when a disease with a positive recommended
/// dose comes back, dispatch the spray. Backend failures are reported
/// and the session carries on.
async fn analyze(
    session: &mut SessionContext,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("leaf.jpg");

    match session.analyze_image(image, filename).await {
        Ok(event) => {
            info!(
                "🌿 {} ({:.1}% confidence), infection {:.1}%, recommended dose {:.1} ml",
                event.disease,
                event.confidence * 100.0,
                event.infection_percentage,
                event.pesticide_amount_ml
            );
            if event.spray_recommended() {
                match session.dispatch_recommended_spray(&event).await {
                    Ok(()) => info!("💧 Spraying {} ml of pesticide", event.pesticide_amount_ml),
                    Err(e) => warn!("Failed to initiate spraying: {}", e),
                }
            }
        }
        Err(e) => warn!("Error analyzing image: {}", e),
    }

    Ok(())
}
