/*!
Per-session context tying the event log, device status, and backend
client together.

One instance exists per user session, constructed at session start and
dropped at session end; nothing is shared across sessions.
*/

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use leafguard_store::{
    validate_spray_amount, DetectionEvent, DeviceId, DeviceState, DeviceStatusMap, EventLog,
    SensorReading, StoreError,
};

use crate::core::client::{BackendClient, ClientError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SessionContext {
    log: EventLog,
    devices: DeviceStatusMap,
    client: Arc<dyn BackendClient>,
}

impl SessionContext {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        info!("Starting new dashboard session");
        Self {
            log: EventLog::new(),
            devices: DeviceStatusMap::new(),
            client,
        }
    }

    /// Classify a leaf image via the backend and record the result in
    /// the detection history.
    pub async fn analyze_image(
        &mut self,
        image: Vec<u8>,
        filename: &str,
    ) -> Result<DetectionEvent, SessionError> {
        let result = self.client.classify(image, filename).await?;
        let event = self.log.record_detection(&result)?;
        Ok(event)
    }

    /// Operator-triggered spray: dispatch to the backend, mark the pump
    /// online, and append the synthetic history entry.
    ///
    /// The amount is validated up front so an invalid request never
    /// reaches the actuation backend or touches the device map.
    pub async fn dispatch_spray(&mut self, amount_ml: f64) -> Result<DetectionEvent, SessionError> {
        validate_spray_amount(amount_ml)?;
        let ack = self.client.spray(amount_ml).await?;
        self.devices.set(DeviceId::Pump, DeviceState::Online);
        let event = self.log.record_manual_spray(ack.amount_ml)?;
        Ok(event)
    }

    /// Spray the dose recommended by a detection. The detection is
    /// already in the history, so this only marks the pump online.
    pub async fn dispatch_recommended_spray(
        &mut self,
        event: &DetectionEvent,
    ) -> Result<(), SessionError> {
        if !event.spray_recommended() {
            warn!(
                disease = %event.disease,
                "No spray recommended for this detection"
            );
            return Ok(());
        }
        self.client.spray(event.pesticide_amount_ml).await?;
        self.devices.set(DeviceId::Pump, DeviceState::Online);
        Ok(())
    }

    pub fn record_reading(&mut self, reading: SensorReading) -> SensorReading {
        self.log.record_sensor_reading(reading)
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn devices(&self) -> &DeviceStatusMap {
        &self.devices
    }
}
