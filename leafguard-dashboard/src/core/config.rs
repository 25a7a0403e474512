/*!
Configuration management for the dashboard session runner
*/

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A simulator channel whose bounds are inverted or non-finite
    /// would panic at poll time; reject it up front instead.
    #[error("invalid {channel} range: min {min} must not exceed max {max}")]
    BadChannelRange {
        channel: &'static str,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Inference and actuation backend settings
    pub backend: BackendConfig,
    /// Telemetry polling and simulator settings
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend serving `/predict` and `/spray`
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Sensor polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Simulator range for air temperature (°C)
    pub temperature: ChannelRange,
    /// Simulator range for relative humidity (%)
    pub humidity: ChannelRange,
    /// Simulator range for soil moisture (%)
    pub soil_moisture: ChannelRange,
    /// Simulator range for soil pH
    pub ph_level: ChannelRange,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            temperature: ChannelRange {
                min: 20.0,
                max: 35.0,
            },
            humidity: ChannelRange {
                min: 40.0,
                max: 80.0,
            },
            soil_moisture: ChannelRange {
                min: 20.0,
                max: 80.0,
            },
            ph_level: ChannelRange { min: 5.5, max: 7.5 },
        }
    }
}

/// Inclusive bounds for one simulated sensor channel.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ChannelRange {
    pub min: f64,
    pub max: f64,
}

impl ChannelRange {
    fn check(&self, channel: &'static str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(ConfigError::BadChannelRange {
                channel,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.temperature.check("temperature")?;
        self.humidity.check("humidity")?;
        self.soil_moisture.check("soil_moisture")?;
        self.ph_level.check("ph_level")?;
        Ok(())
    }
}

/// Load configuration from a TOML file, or fall back to the defaults
/// when no path is given.
pub async fn load_config(path: Option<&Path>) -> Result<DashboardConfig, ConfigError> {
    let config = match path {
        Some(path) => {
            let content = tokio::fs::read_to_string(path).await?;
            toml::from_str(&content)?
        }
        None => DashboardConfig::default(),
    };
    config.telemetry.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_simulator_ranges() {
        let config = DashboardConfig::default();
        assert_eq!(config.backend.base_url, "http://localhost:5000");
        assert_eq!(config.telemetry.temperature.min, 20.0);
        assert_eq!(config.telemetry.temperature.max, 35.0);
        assert_eq!(config.telemetry.ph_level.min, 5.5);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: DashboardConfig = toml::from_str(
            r#"
[backend]
base_url = "http://greenhouse.local:8000"

[telemetry]
poll_interval_ms = 500
"#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "http://greenhouse.local:8000");
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.telemetry.poll_interval_ms, 500);
        assert_eq!(config.telemetry.humidity.max, 80.0);
    }

    #[test]
    fn inverted_channel_range_is_rejected() {
        let config: DashboardConfig = toml::from_str(
            r#"
[telemetry.temperature]
min = 35.0
max = 20.0
"#,
        )
        .unwrap();
        let err = config.telemetry.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::BadChannelRange {
                channel: "temperature",
                ..
            }
        ));
    }

    #[test]
    fn non_finite_channel_bound_is_rejected() {
        let range = ChannelRange {
            min: f64::NAN,
            max: 35.0,
        };
        assert!(range.check("temperature").is_err());
    }
}
