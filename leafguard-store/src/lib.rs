/*!
Session event log for the leafguard plant disease dashboard.

Accumulates detection events and sensor readings during a single user
session, enforces the sensor retention bound, and produces the derived
views (recent detections, disease distribution, pesticide usage trend)
and export serializations the dashboard displays. Everything here is a
pure in-memory transformation; the HTTP backend and telemetry sources
live in the dashboard crate.
*/

pub mod error;
pub mod events;
pub mod export;
pub mod store;

pub use error::StoreError;
pub use events::{
    DetectionEvent, DetectionResult, DeviceId, DeviceState, DeviceStatusMap, SensorReading,
    HEALTHY_LABEL, MANUAL_SPRAY_LABEL,
};
pub use export::ExportFormat;
pub use store::{validate_spray_amount, EventLog, SENSOR_RETENTION};
