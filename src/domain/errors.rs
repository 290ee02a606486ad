//! Domain error types
//!
//! This module defines the error hierarchy for Conductor. All errors are
//! domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Conductor error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum ConductorError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transform-service-related errors
    #[error("Transform service error: {0}")]
    Transform(#[from] TransformError),

    /// GTFS merge errors
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Pipeline sequencing errors
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Provider lookup/validation errors
    #[error("Provider error: {0}")]
    Provider(String),

    /// Feed storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Graph build errors
    #[error("Graph build error: {0}")]
    GraphBuild(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Transform-service-specific errors
///
/// Errors that occur when submitting jobs to or polling the external
/// transform service. These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Failed to connect to the transform service
    #[error("Failed to connect to transform service: {0}")]
    ConnectionFailed(String),

    /// Submission rejected because the feed file is missing or empty
    #[error("Missing feed file: {0}")]
    MissingFile(String),

    /// Submission rejected because the parameter document is missing or empty
    #[error("Missing job parameters: {0}")]
    MissingParameters(String),

    /// The submission response carried no status URL
    #[error("No job status URL in submission response: {0}")]
    MissingLocation(String),

    /// The job status document carried no action report link
    #[error("No action report link in job status: {0}")]
    MissingActionReport(String),

    /// Invalid response from the service
    #[error("Invalid response from transform service: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Transform service server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Transform service client error: {status} - {message}")]
    ClientError { status: u16, message: String },
}

/// Merge-engine-specific errors
///
/// Any of these is fatal to the whole merge run. `Encoding` is kept distinct
/// from generic I/O so callers can quarantine a bad archive instead of
/// retrying it.
#[derive(Debug, Error)]
pub enum MergeError {
    /// I/O error while reading or writing merged files
    #[error("I/O error during merge: {0}")]
    Io(String),

    /// CSV parse/write error in a GTFS entry
    #[error("CSV error during merge: {0}")]
    Csv(String),

    /// Structural zip archive error
    #[error("Archive error during merge: {0}")]
    Archive(String),

    /// Non-UTF-8 zip entry name or content
    #[error("Encoding error during merge: {0}")]
    Encoding(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for ConductorError {
    fn from(err: std::io::Error) -> Self {
        ConductorError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ConductorError {
    fn from(err: serde_json::Error) -> Self {
        ConductorError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ConductorError {
    fn from(err: toml::de::Error) -> Self {
        ConductorError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<std::io::Error> for MergeError {
    fn from(err: std::io::Error) -> Self {
        MergeError::Io(err.to_string())
    }
}

// CSV errors carry UTF-8 failures as a dedicated kind; those map to
// `Encoding`, everything else to `Csv`.
impl From<csv::Error> for MergeError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Utf8 { .. } => MergeError::Encoding(err.to_string()),
            _ => MergeError::Csv(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for MergeError {
    fn from(err: zip::result::ZipError) -> Self {
        MergeError::Archive(err.to_string())
    }
}
