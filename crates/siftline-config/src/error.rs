//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Structured errors emitted while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read from disk.
    #[error("failed to read configuration file '{path}'")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file did not parse as valid YAML.
    #[error("failed to parse configuration file '{path}'")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A field contained a value outside its allowed range or set.
    #[error("invalid value for '{field}' in '{section}': {reason}")]
    InvalidField {
        /// Section containing the offending field.
        section: String,
        /// Field name.
        field: String,
        /// Human-readable description of why the value is invalid.
        reason: String,
    },

    /// A required field was missing from the loaded document.
    #[error("missing required field '{field}' in '{section}'")]
    MissingField {
        /// Section containing the missing field.
        section: String,
        /// Field name.
        field: String,
    },

    /// An environment variable override could not be parsed into its target type.
    #[error("environment override '{var}' could not be parsed: {reason}")]
    InvalidEnvOverride {
        /// Environment variable name.
        var: String,
        /// Parse failure description.
        reason: String,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_field_renders_section_field_and_reason() {
        let err = ConfigError::InvalidField {
            section: "proxy".to_string(),
            field: "cooldown_seconds".to_string(),
            reason: "must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for 'cooldown_seconds' in 'proxy': must be positive"
        );
    }
}
