//! Error types for farm plot domain values

use thiserror::Error;

/// Result type alias using the farm plot Error
pub type Result<T> = std::result::Result<T, Error>;

/// Farm plot domain errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Unknown crop type: {0}")]
    UnknownCropType(String),

    #[error("Invalid hectares value: {0}")]
    InvalidHectares(String),

    #[error("Malformed API envelope: {0}")]
    Envelope(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn missing(field: &str) -> Self {
        Error::InvalidField {
            field: field.to_string(),
            reason: "missing".to_string(),
        }
    }
}
