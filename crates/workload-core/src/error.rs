//! Configuration error types.

/// Error type for workload configuration.
///
/// Every variant is fatal for the step it concerns: the runner cannot
/// produce correct traffic, so nothing is defaulted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error reading the workload file
    #[error("Failed to read workload file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A required parameter is absent
    #[error("Step '{step}': missing required parameter '{field}'")]
    MissingParam { step: String, field: String },

    /// A parameter is present but has the wrong shape
    #[error("Step '{step}': invalid parameter '{field}': {reason}")]
    InvalidParam {
        step: String,
        field: String,
        reason: String,
    },

    /// Time-series step with no start, no prior base and no resolvable value
    #[error("Step '{0}': invalid timeseries configuration, no start/step and no value")]
    MissingTimeAnchor(String),

    /// Dictionary referenced by a step does not exist
    #[error("Step '{step}': series dictionary '{dictionary}' not found")]
    DictionaryNotFound { step: String, dictionary: String },

    /// Two steps share a name
    #[error("Duplicate workload step name: {0}")]
    DuplicateStep(String),
}

impl ConfigError {
    pub fn missing(step: &str, field: &str) -> Self {
        ConfigError::MissingParam {
            step: step.to_string(),
            field: field.to_string(),
        }
    }

    pub fn invalid(step: &str, field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParam {
            step: step.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
