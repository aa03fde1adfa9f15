//! Configuration parsing and validation for gigclock
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Site definitions with geofence radius
//! - Shift thresholds, globally and per site
//! - Verification policy
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {}", join_errors(.errors))]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string.
///
/// All validation problems are reported together rather than stopping at
/// the first one.
pub fn parse_config(content: &str) -> ConfigResult<Policy> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    match validate_config(&raw) {
        errors if errors.is_empty() => Ok(Policy::from_raw(raw)),
        errors => Err(ConfigError::ValidationFailed { errors }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_minimal_config() {
        let config = r#"
            config_version = 1

            [[sites]]
            id = "hq"
            label = "Head office"
            latitude = 39.908823
            longitude = 116.397470
        "#;

        let policy = parse_config(config).unwrap();
        assert_eq!(policy.sites.len(), 1);
        assert_eq!(policy.sites[0].id.as_str(), "hq");
        assert!(!policy.verification_required);
        assert_eq!(policy.default_schedule, Default::default());
    }

    #[test]
    fn reject_wrong_version() {
        let config = r#"
            config_version = 99

            [[sites]]
            id = "hq"
            label = "Head office"
            latitude = 0.0
            longitude = 0.0
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_config() {
        let config = r#"
            config_version = 1

            [[sites]]
            id = "hq"
            label = "Head office"
            latitude = 120.0
            longitude = 0.0
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "config_version = 1\n[[sites]]\nid = \"hq\"\nlabel = \"HQ\"\nlatitude = 1.0\nlongitude = 2.0"
        )
        .unwrap();

        let policy = load_config(file.path()).unwrap();
        assert_eq!(policy.sites[0].coordinate.longitude(), 2.0);

        assert!(matches!(
            load_config(file.path().with_extension("missing")),
            Err(ConfigError::ReadError { .. })
        ));
    }
}
