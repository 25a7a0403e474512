/*!
Telemetry sources and the interval-driven polling stream.

The session is agnostic to where readings come from: the synthetic
generator below and a poller against real greenhouse hardware are
interchangeable implementations of [`SensorSource`].
*/

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use rand::Rng;
use tokio_stream::{wrappers::IntervalStream, StreamExt};
use tracing::{error, info};

use leafguard_store::SensorReading;

use crate::core::config::{ChannelRange, TelemetryConfig};

/// Events emitted by the telemetry polling loop
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// A fresh sensor reading arrived
    Reading(SensorReading),
    /// The source failed to produce a sample
    SourceError(String),
}

/// A supplier of sensor readings.
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Name of the source, for logging
    fn name(&self) -> &'static str;

    /// Produce one reading, stamped at sample time.
    async fn sample(&self) -> Result<SensorReading, Box<dyn std::error::Error + Send + Sync>>;
}

/// Stand-in for greenhouse hardware: uniformly distributed values per
/// channel within the configured ranges.
pub struct SimulatedSensorSource {
    config: TelemetryConfig,
}

impl SimulatedSensorSource {
    pub fn new(config: TelemetryConfig) -> Self {
        Self { config }
    }

    fn draw(range: &ChannelRange) -> f64 {
        rand::rng().random_range(range.min..=range.max)
    }
}

#[async_trait]
impl SensorSource for SimulatedSensorSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn sample(&self) -> Result<SensorReading, Box<dyn std::error::Error + Send + Sync>> {
        Ok(SensorReading {
            temperature: Self::draw(&self.config.temperature),
            humidity: Self::draw(&self.config.humidity),
            soil_moisture: Self::draw(&self.config.soil_moisture),
            ph_level: Self::draw(&self.config.ph_level),
            timestamp: Utc::now().trunc_subsecs(0),
        })
    }
}

/// Turns a sensor source into an interval-driven event stream.
pub struct TelemetryPoller {
    source: Box<dyn SensorSource>,
    poll_interval_ms: u64,
}

impl TelemetryPoller {
    pub fn new(source: Box<dyn SensorSource>, poll_interval_ms: u64) -> Self {
        Self {
            source,
            poll_interval_ms,
        }
    }

    /// Start polling the source for readings
    pub async fn start(&mut self) -> impl StreamExt<Item = TelemetryEvent> {
        info!(
            source = self.source.name(),
            interval_ms = self.poll_interval_ms,
            "Starting telemetry polling"
        );
        let interval = Duration::from_millis(self.poll_interval_ms);
        let mut interval_stream = IntervalStream::new(tokio::time::interval(interval));

        async_stream::stream! {
            while interval_stream.next().await.is_some() {
                match self.source.sample().await {
                    Ok(reading) => yield TelemetryEvent::Reading(reading),
                    Err(e) => {
                        error!("Telemetry source error: {}", e);
                        yield TelemetryEvent::SourceError(e.to_string());
                    }
                }
            }
        }
    }
}
