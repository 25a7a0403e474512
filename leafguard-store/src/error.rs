/*!
Error taxonomy for the session event log.

Every operation on the log is an in-memory transformation, so all of
these are validation failures on malformed input, raised synchronously
to the caller. Network failures belong to the dashboard crate's client
layer and never originate here.
*/

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Detection payload from the backend is missing a required field.
    /// The record is rejected and the log is left unchanged.
    #[error("detection result missing required field `{0}`")]
    MalformedResult(&'static str),

    /// A spray amount must be a non-negative number of milliliters.
    #[error("invalid spray amount: {0} ml")]
    InvalidAmount(f64),

    /// Export requested in a format the log does not know how to produce.
    #[error("unsupported export format `{0}`")]
    UnsupportedFormat(String),

    /// JSON serialization failed while exporting the history.
    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}
