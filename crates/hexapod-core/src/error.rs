use thiserror::Error;

/// Top-level error type for the hexapod crates.
#[derive(Debug, Error)]
pub enum HexapodError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Leg index {index} out of range (robot has {count} legs)")]
    LegOutOfRange { index: usize, count: usize },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid frame_dt: {0} (must be > 0)")]
    InvalidFrameDt(f32),

    #[error("Expected {expected} leg mounts, got {got}")]
    LegCount { expected: usize, got: usize },

    #[error("Tripod groups must split legs 0..{legs} into two disjoint groups of three: {message}")]
    InvalidGroups { legs: usize, message: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexapod_error_from_config_error() {
        let err = ConfigError::InvalidFrameDt(-1.0);
        let hexapod_err: HexapodError = err.into();
        assert!(matches!(hexapod_err, HexapodError::Config(_)));
        assert!(hexapod_err.to_string().contains("-1"));
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }

    #[test]
    fn config_error_display_messages() {
        assert_eq!(
            ConfigError::InvalidFrameDt(0.0).to_string(),
            "Invalid frame_dt: 0 (must be > 0)"
        );
        assert_eq!(
            ConfigError::LegCount {
                expected: 6,
                got: 4
            }
            .to_string(),
            "Expected 6 leg mounts, got 4"
        );
        assert_eq!(
            ConfigError::invalid("gait.step_height", "must be non-negative").to_string(),
            "Invalid value for gait.step_height: must be non-negative"
        );
    }

    #[test]
    fn hexapod_error_display_messages() {
        assert_eq!(
            HexapodError::UnknownNode("leg9_foot".into()).to_string(),
            "Unknown node: leg9_foot"
        );
        assert_eq!(
            HexapodError::LegOutOfRange { index: 7, count: 6 }.to_string(),
            "Leg index 7 out of range (robot has 6 legs)"
        );
    }
}
