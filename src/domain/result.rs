//! Result type alias for Conductor

use super::errors::ConductorError;

/// Result type alias for Conductor operations
///
/// This is a convenience type alias that uses `ConductorError` as the error
/// type. Use this throughout the codebase for fallible operations.
///
/// # Examples
///
/// ```
/// use conductor::domain::result::Result;
/// use conductor::domain::errors::ConductorError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(ConductorError::Pipeline("stage already active".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ConductorError>;
