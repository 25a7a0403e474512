/*!
Serialization of the detection history for user download.
*/

use std::borrow::Cow;
use std::fmt::Write as _;
use std::str::FromStr;

use crate::error::StoreError;
use crate::events::DetectionEvent;

/// Column order of the tabular export; the JSON export carries the same
/// fields as an array of objects.
pub const CSV_HEADER: &str = "disease,confidence,infection_percentage,pesticide_amount_ml,timestamp";

/// Timestamp format used in the CSV export, matching what the dashboard
/// displays.
pub const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(StoreError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl ExportFormat {
    /// MIME type the caller should attach when offering the download.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Render the history as delimited text, one row per event.
pub fn to_csv(events: &[DetectionEvent]) -> String {
    let mut out = String::with_capacity(64 * (events.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for event in events {
        // write! into a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            escape_field(&event.disease),
            event.confidence,
            event.infection_percentage,
            event.pesticide_amount_ml,
            event.timestamp.format(CSV_TIMESTAMP_FORMAT)
        );
    }
    out
}

/// Render the history as a pretty-printed JSON array of objects.
pub fn to_json(events: &[DetectionEvent]) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec_pretty(events)?)
}

/// Double-quote a field when it contains a delimiter, quote, or newline.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone, Utc};

    fn event(disease: &str, amount_ml: f64, secs: i64) -> DetectionEvent {
        DetectionEvent {
            disease: disease.to_string(),
            confidence: 0.87,
            infection_percentage: 42.5,
            pesticide_amount_ml: amount_ml,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    fn parse_csv(text: &str) -> Vec<DetectionEvent> {
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        lines
            .map(|line| {
                let fields: Vec<&str> = line.split(',').collect();
                assert_eq!(fields.len(), 5);
                let naive =
                    NaiveDateTime::parse_from_str(fields[4], CSV_TIMESTAMP_FORMAT).unwrap();
                DetectionEvent {
                    disease: fields[0].to_string(),
                    confidence: fields[1].parse().unwrap(),
                    infection_percentage: fields[2].parse().unwrap(),
                    pesticide_amount_ml: fields[3].parse().unwrap(),
                    timestamp: naive.and_utc(),
                }
            })
            .collect()
    }

    #[test]
    fn csv_round_trips_zero_and_fractional_amounts() {
        let events = vec![
            event("Healthy", 0.0, 1_700_000_000),
            event("Blight", 12.5, 1_700_000_060),
        ];
        let parsed = parse_csv(&to_csv(&events));
        assert_eq!(parsed, events);
    }

    #[test]
    fn csv_of_empty_history_is_header_only() {
        assert_eq!(to_csv(&[]), format!("{CSV_HEADER}\n"));
    }

    #[test]
    fn json_export_is_an_array_of_records() {
        let events = vec![event("Blight", 25.0, 1_700_000_000)];
        let bytes = to_json(&events).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["disease"], "Blight");
        assert_eq!(records[0]["pesticide_amount_ml"], 25.0);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = "xlsx".parse::<ExportFormat>().unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedFormat(f) if f == "xlsx"));
    }

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("Json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        let csv = to_csv(&[event("Rust, severe", 5.0, 1_700_000_000)]);
        assert!(csv.contains("\"Rust, severe\""));
    }
}
