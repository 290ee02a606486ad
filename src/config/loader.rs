//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ConductorConfig;
use crate::domain::errors::ConductorError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ConductorConfig
/// 4. Applies environment variable overrides (CONDUCTOR_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use conductor::config::load_config;
///
/// let config = load_config("conductor.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ConductorConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConductorError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ConductorError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: ConductorConfig = toml::from_str(&contents)
        .map_err(|e| ConductorError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        ConductorError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    // Process line by line to skip comments
    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ConductorError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the CONDUCTOR_* prefix
///
/// Environment variables follow the pattern: CONDUCTOR_<SECTION>_<KEY>
/// For example: CONDUCTOR_TRANSFORM_BASE_URL, CONDUCTOR_APPLICATION_LOG_LEVEL
fn apply_env_overrides(config: &mut ConductorConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("CONDUCTOR_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("CONDUCTOR_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Transform service overrides
    if let Ok(val) = std::env::var("CONDUCTOR_TRANSFORM_BASE_URL") {
        config.transform.base_url = val;
    }
    if let Ok(val) = std::env::var("CONDUCTOR_TRANSFORM_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.transform.timeout_seconds = timeout;
        }
    }
    if let Ok(val) = std::env::var("CONDUCTOR_TRANSFORM_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.transform.max_retries = retries;
        }
    }
    if let Ok(val) = std::env::var("CONDUCTOR_TRANSFORM_RETRY_DELAY_SECONDS") {
        if let Ok(delay) = val.parse() {
            config.transform.retry_delay_seconds = delay;
        }
    }

    // Pipeline overrides
    if let Ok(val) = std::env::var("CONDUCTOR_PIPELINE_WORKING_DIRECTORY") {
        config.pipeline.working_directory = val;
    }
    if let Ok(val) = std::env::var("CONDUCTOR_PIPELINE_MERGED_FEED_NAME") {
        config.pipeline.merged_feed_name = val;
    }
    if let Ok(val) = std::env::var("CONDUCTOR_PIPELINE_REMOVE_SHAPES") {
        config.pipeline.remove_shapes = val.parse().unwrap_or(false);
    }

    // Storage overrides
    if let Ok(val) = std::env::var("CONDUCTOR_STORAGE_ROOT") {
        config.storage.root = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("CONDUCTOR_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("CONDUCTOR_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
