//! Domain identifier types
//!
//! Newtype wrappers for the identifiers that flow through the pipeline.
//! Each type ensures type safety and provides validation where a format
//! is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider identifier
///
/// Stable numeric identifier of a data provider (tenant). Assigned by the
/// provider registry and never reused.
///
/// # Examples
///
/// ```
/// use conductor::domain::ids::ProviderId;
///
/// let id = ProviderId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(i64);

impl ProviderId {
    /// Creates a new ProviderId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the numeric value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|_| format!("Invalid provider id: {s}"))
    }
}

/// Referential identifier newtype wrapper
///
/// A provider's isolated data-space identifier within the transform service.
/// Interpolated into transform-service URLs, so it must be non-empty and
/// free of path separators.
///
/// # Examples
///
/// ```
/// use conductor::domain::ids::Referential;
///
/// let referential = Referential::new("opb").unwrap();
/// assert_eq!(referential.as_str(), "opb");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Referential(String);

impl Referential {
    /// Creates a new Referential from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty or contains `/`.
    pub fn new(referential: impl Into<String>) -> Result<Self, String> {
        let referential = referential.into();
        if referential.trim().is_empty() {
            return Err("Referential cannot be empty".to_string());
        }
        if referential.contains('/') {
            return Err(format!("Referential cannot contain '/': {referential}"));
        }
        Ok(Self(referential))
    }

    /// Returns the referential as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Referential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Referential {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Referential {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Correlation identifier
///
/// Propagated end-to-end through a pipeline run so that events from the
/// submission, the poller and the classifier can be tied back together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Creates a fresh random correlation id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wraps an existing correlation id, e.g. one received from an
    /// upstream system
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty.
    pub fn from_existing(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Correlation id cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the correlation id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
