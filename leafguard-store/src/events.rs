/*!
Event types recorded during a dashboard session.
*/

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel label the backend returns when no disease is present.
pub const HEALTHY_LABEL: &str = "Healthy";

/// Synthetic label for operator-triggered sprays in the detection history.
pub const MANUAL_SPRAY_LABEL: &str = "Manual Spray";

/// One entry in the detection history.
///
/// Built either from a backend classification response or synthesized
/// for a manual spray. The timestamp is stamped by the log at append
/// time, not taken from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub disease: String,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    /// Estimated infected leaf area in [0, 100] percent.
    pub infection_percentage: f64,
    /// Recommended pesticide dose, non-negative.
    pub pesticide_amount_ml: f64,
    pub timestamp: DateTime<Utc>,
}

impl DetectionEvent {
    /// Whether this detection warrants offering a spray action.
    pub fn spray_recommended(&self) -> bool {
        offer_spray(&self.disease, self.pesticide_amount_ml)
    }
}

/// The spray-offer rule: a disease was found and the backend recommended
/// a positive dose. Dose and infection percentage are not cross-checked;
/// the backend owns the dose computation.
fn offer_spray(disease: &str, pesticide_amount_ml: f64) -> bool {
    disease != HEALTHY_LABEL && pesticide_amount_ml > 0.0
}

/// Raw classification payload from the inference backend.
///
/// Every field is optional here: the backend contract promises them all,
/// but the log validates presence itself so a short response can never
/// leave a partial entry in the history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionResult {
    pub disease: Option<String>,
    pub confidence: Option<f64>,
    pub infection_percentage: Option<f64>,
    pub pesticide_amount_ml: Option<f64>,
    /// Optional segmentation artifact; carried through untouched, never
    /// interpreted by this crate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segmentation_map: Option<serde_json::Value>,
}

impl DetectionResult {
    /// Whether this result warrants offering a spray action. A payload
    /// missing either field never recommends one.
    pub fn spray_recommended(&self) -> bool {
        match (self.disease.as_deref(), self.pesticide_amount_ml) {
            (Some(disease), Some(amount_ml)) => offer_spray(disease, amount_ml),
            _ => false,
        }
    }
}

/// One sample of the four environmental channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Air temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Soil moisture in percent.
    pub soil_moisture: f64,
    /// Soil pH.
    pub ph_level: f64,
    pub timestamp: DateTime<Utc>,
}

/// The fixed set of devices the dashboard reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceId {
    Controller,
    Camera,
    Pump,
    SensorHub,
}

impl DeviceId {
    pub const ALL: [DeviceId; 4] = [
        DeviceId::Controller,
        DeviceId::Camera,
        DeviceId::Pump,
        DeviceId::SensorHub,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DeviceId::Controller => "controller",
            DeviceId::Camera => "camera",
            DeviceId::Pump => "pump",
            DeviceId::SensorHub => "sensor-hub",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Online,
    Offline,
}

/// Connectivity state per device.
///
/// Mutated only by explicit events (a successful spray dispatch marks
/// the pump online); there is no health check or timeout demotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatusMap {
    states: HashMap<DeviceId, DeviceState>,
}

impl Default for DeviceStatusMap {
    /// Everything starts online except the pump, which only comes up
    /// once a spray has actually been dispatched.
    fn default() -> Self {
        let mut states = HashMap::new();
        for device in DeviceId::ALL {
            let state = match device {
                DeviceId::Pump => DeviceState::Offline,
                _ => DeviceState::Online,
            };
            states.insert(device, state);
        }
        Self { states }
    }
}

impl DeviceStatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, device: DeviceId) -> DeviceState {
        // The map is seeded with every device at construction.
        self.states
            .get(&device)
            .copied()
            .unwrap_or(DeviceState::Offline)
    }

    pub fn set(&mut self, device: DeviceId, state: DeviceState) {
        self.states.insert(device, state);
    }

    /// Snapshot in the fixed device order, for status display.
    pub fn snapshot(&self) -> Vec<(DeviceId, DeviceState)> {
        DeviceId::ALL
            .iter()
            .map(|&device| (device, self.state(device)))
            .collect()
    }
}
