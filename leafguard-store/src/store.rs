/*!
The session event log: append-only detection history plus a bounded
sensor reading stream, with the derived views the dashboard renders.
*/

use std::collections::VecDeque;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::events::{DetectionEvent, DetectionResult, SensorReading, MANUAL_SPRAY_LABEL};
use crate::export::{self, ExportFormat};

/// Maximum number of sensor readings retained; older entries are evicted
/// strictly by age.
pub const SENSOR_RETENTION: usize = 100;

/// Check a spray amount before it goes anywhere: the history, or the
/// actuation backend. NaN and infinities are as unusable as a negative
/// dose.
pub fn validate_spray_amount(amount_ml: f64) -> Result<(), StoreError> {
    if !amount_ml.is_finite() || amount_ml < 0.0 {
        return Err(StoreError::InvalidAmount(amount_ml));
    }
    Ok(())
}

/// In-memory log of one session's detection events and sensor readings.
///
/// Append-only for detections (until an explicit `clear_history`),
/// FIFO-bounded for sensor readings. One instance per user session; the
/// contents vanish when the session ends.
#[derive(Debug, Default)]
pub struct EventLog {
    detections: Vec<DetectionEvent>,
    readings: VecDeque<SensorReading>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a backend classification payload and append it to the
    /// detection history, stamped with the current time.
    ///
    /// A payload missing any required field is rejected whole; nothing
    /// partial ever reaches the analytics views.
    pub fn record_detection(
        &mut self,
        result: &DetectionResult,
    ) -> Result<DetectionEvent, StoreError> {
        let disease = result
            .disease
            .clone()
            .ok_or(StoreError::MalformedResult("disease"))?;
        let confidence = result
            .confidence
            .ok_or(StoreError::MalformedResult("confidence"))?;
        let infection_percentage = result
            .infection_percentage
            .ok_or(StoreError::MalformedResult("infection_percentage"))?;
        let pesticide_amount_ml = result
            .pesticide_amount_ml
            .ok_or(StoreError::MalformedResult("pesticide_amount_ml"))?;

        let event = DetectionEvent {
            disease,
            confidence,
            infection_percentage,
            pesticide_amount_ml,
            timestamp: self.next_timestamp(),
        };

        info!(
            disease = %event.disease,
            confidence = event.confidence,
            "Recorded detection event"
        );
        self.detections.push(event.clone());
        Ok(event)
    }

    /// Append the synthetic history entry for an operator-triggered spray.
    pub fn record_manual_spray(&mut self, amount_ml: f64) -> Result<DetectionEvent, StoreError> {
        validate_spray_amount(amount_ml)?;

        let event = DetectionEvent {
            disease: MANUAL_SPRAY_LABEL.to_string(),
            confidence: 1.0,
            infection_percentage: 0.0,
            pesticide_amount_ml: amount_ml,
            timestamp: self.next_timestamp(),
        };

        info!(amount_ml, "Recorded manual spray");
        self.detections.push(event.clone());
        Ok(event)
    }

    /// Append a sensor reading, evicting the oldest entries once the
    /// retention bound is exceeded.
    pub fn record_sensor_reading(&mut self, reading: SensorReading) -> SensorReading {
        self.readings.push_back(reading.clone());
        while self.readings.len() > SENSOR_RETENTION {
            self.readings.pop_front();
        }
        debug!(retained = self.readings.len(), "Recorded sensor reading");
        reading
    }

    /// The last `n` detections in arrival order. Asking for more than
    /// exist returns the whole history.
    pub fn recent_detections(&self, n: usize) -> &[DetectionEvent] {
        let start = self.detections.len().saturating_sub(n);
        &self.detections[start..]
    }

    pub fn detection_count(&self) -> usize {
        self.detections.len()
    }

    /// Most recent sensor reading, if any have been recorded.
    pub fn latest_sensor_reading(&self) -> Option<&SensorReading> {
        self.readings.back()
    }

    pub fn sensor_readings(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.iter()
    }

    /// Count of each distinct disease label across the full history.
    ///
    /// Pairs are ordered by first occurrence, which keeps the output
    /// deterministic; consumers should treat it as an unordered set of
    /// (label, count) pairs.
    pub fn disease_distribution(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for event in &self.detections {
            match counts.iter_mut().find(|(label, _)| *label == event.disease) {
                Some((_, count)) => *count += 1,
                None => counts.push((event.disease.clone(), 1)),
            }
        }
        counts
    }

    /// (timestamp, dose) pairs sorted ascending by timestamp for trend
    /// charting. The sort is stable, so entries sharing a timestamp keep
    /// their arrival order.
    pub fn pesticide_usage_series(&self) -> Vec<(DateTime<Utc>, f64)> {
        let mut series: Vec<(DateTime<Utc>, f64)> = self
            .detections
            .iter()
            .map(|event| (event.timestamp, event.pesticide_amount_ml))
            .collect();
        series.sort_by_key(|(timestamp, _)| *timestamp);
        series
    }

    /// Serialize the full detection history in the named format
    /// (`"csv"` or `"json"`, case-insensitive).
    pub fn export(&self, format: &str) -> Result<Vec<u8>, StoreError> {
        let format: ExportFormat = format.parse()?;
        match format {
            ExportFormat::Csv => Ok(export::to_csv(&self.detections).into_bytes()),
            ExportFormat::Json => export::to_json(&self.detections),
        }
    }

    /// Drop the detection history. Sensor readings and device status
    /// have independent lifecycles and are untouched.
    pub fn clear_history(&mut self) {
        let dropped = self.detections.len();
        self.detections.clear();
        info!(dropped, "Cleared detection history");
    }

    /// Second-resolution timestamp for a new entry, clamped so append
    /// order stays monotonically non-decreasing even if the wall clock
    /// steps backward between appends.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(0);
        match self.detections.last() {
            Some(prev) if prev.timestamp > now => prev.timestamp,
            _ => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(temperature: f64) -> SensorReading {
        SensorReading {
            temperature,
            humidity: 55.0,
            soil_moisture: 40.0,
            ph_level: 6.5,
            timestamp: Utc::now().trunc_subsecs(0),
        }
    }

    fn result(disease: &str, amount_ml: f64) -> DetectionResult {
        DetectionResult {
            disease: Some(disease.to_string()),
            confidence: Some(0.92),
            infection_percentage: Some(18.5),
            pesticide_amount_ml: Some(amount_ml),
            segmentation_map: None,
        }
    }

    fn event_at(secs: i64, amount_ml: f64) -> DetectionEvent {
        DetectionEvent {
            disease: "Blight".to_string(),
            confidence: 0.9,
            infection_percentage: 12.0,
            pesticide_amount_ml: amount_ml,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn sensor_log_keeps_only_the_last_hundred() {
        let mut log = EventLog::new();
        for k in 0..150 {
            log.record_sensor_reading(reading(k as f64));
        }
        let retained: Vec<f64> = log.sensor_readings().map(|r| r.temperature).collect();
        assert_eq!(retained.len(), SENSOR_RETENTION);
        // Eviction is strictly by age: the survivors are readings 50..150
        // in original order.
        let expected: Vec<f64> = (50..150).map(|k| k as f64).collect();
        assert_eq!(retained, expected);
        assert_eq!(log.latest_sensor_reading().unwrap().temperature, 149.0);
    }

    #[test]
    fn recent_detections_bounds() {
        let mut log = EventLog::new();
        log.record_detection(&result("Blight", 25.0)).unwrap();
        log.record_detection(&result("Healthy", 0.0)).unwrap();

        assert_eq!(log.recent_detections(0).len(), 0);
        assert_eq!(log.recent_detections(1).len(), 1);
        assert_eq!(log.recent_detections(1)[0].disease, "Healthy");

        let all = log.recent_detections(10);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].disease, "Blight");
        assert_eq!(all[1].disease, "Healthy");
    }

    #[test]
    fn disease_distribution_counts_every_event() {
        let mut log = EventLog::new();
        for disease in ["Blight", "Healthy", "Blight"] {
            log.record_detection(&result(disease, 10.0)).unwrap();
        }
        let distribution = log.disease_distribution();
        assert_eq!(
            distribution,
            vec![("Blight".to_string(), 2), ("Healthy".to_string(), 1)]
        );
        let total: usize = distribution.iter().map(|(_, count)| count).sum();
        assert_eq!(total, log.detection_count());
    }

    #[test]
    fn usage_series_is_sorted_and_stable() {
        let mut log = EventLog::new();
        // Out-of-order timestamps cannot arise through the recording API,
        // but the series must sort whatever the history holds.
        log.detections.push(event_at(300, 30.0));
        log.detections.push(event_at(100, 10.0));
        log.detections.push(event_at(200, 20.0));
        log.detections.push(event_at(200, 21.0));

        let series = log.pesticide_usage_series();
        let doses: Vec<f64> = series.iter().map(|(_, ml)| *ml).collect();
        assert_eq!(doses, vec![10.0, 20.0, 21.0, 30.0]);
        assert!(series.windows(2).all(|w| w[0].0 <= w[1].0));

        // Sorting an already-sorted series changes nothing.
        let mut resorted = series.clone();
        resorted.sort_by_key(|(timestamp, _)| *timestamp);
        assert_eq!(resorted, series);
    }

    #[test]
    fn manual_spray_synthesizes_fixed_fields() {
        let mut log = EventLog::new();
        let event = log.record_manual_spray(50.0).unwrap();
        assert_eq!(event.disease, MANUAL_SPRAY_LABEL);
        assert_eq!(event.confidence, 1.0);
        assert_eq!(event.infection_percentage, 0.0);
        assert_eq!(event.pesticide_amount_ml, 50.0);
        assert_eq!(log.detection_count(), 1);
    }

    #[test]
    fn negative_spray_amount_is_rejected() {
        let mut log = EventLog::new();
        let err = log.record_manual_spray(-1.0).unwrap_err();
        assert!(matches!(err, StoreError::InvalidAmount(_)));
        assert_eq!(log.detection_count(), 0);
    }

    #[test]
    fn malformed_result_leaves_log_unchanged() {
        let mut log = EventLog::new();
        log.record_detection(&result("Blight", 25.0)).unwrap();

        let mut missing_confidence = result("Mildew", 15.0);
        missing_confidence.confidence = None;
        let err = log.record_detection(&missing_confidence).unwrap_err();
        assert!(matches!(err, StoreError::MalformedResult("confidence")));

        let history = log.recent_detections(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].disease, "Blight");
    }

    #[test]
    fn clear_history_spares_sensor_readings() {
        let mut log = EventLog::new();
        log.record_sensor_reading(reading(24.0));
        log.record_detection(&result("Blight", 25.0)).unwrap();

        log.clear_history();
        assert!(log.recent_detections(10).is_empty());
        assert_eq!(log.latest_sensor_reading().unwrap().temperature, 24.0);
    }

    #[test]
    fn timestamps_never_decrease_in_append_order() {
        let mut log = EventLog::new();
        // Seed an entry stamped in the future; the next append must not
        // go backward.
        let future = Utc::now().trunc_subsecs(0) + chrono::Duration::seconds(3600);
        let mut seeded = event_at(0, 5.0);
        seeded.timestamp = future;
        log.detections.push(seeded);

        let event = log.record_manual_spray(10.0).unwrap();
        assert_eq!(event.timestamp, future);
    }
}
