//! Error types for the patch engine

use thiserror::Error;

/// Result type for patch engine operations
pub type Result<T> = std::result::Result<T, PatchError>;

/// Patch engine errors
///
/// Only data and configuration problems are reported here. A resolved path
/// that names an unregistered patch, a missing creator, or a helper
/// existence violation is a build/registration bug and panics instead.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Missing information: object {object} has no '{key}' metadata")]
    MissingInformation { object: String, key: String },

    #[error("Impossible conversion: no patch path from {classname}@{from} to version {to}")]
    ImpossibleConversion {
        classname: String,
        from: String,
        to: String,
    },

    #[error("Unknown context version: {context}/{version}")]
    UnknownContextVersion { context: String, version: String },

    #[error("Unknown structural version: {classname}@{version}")]
    UnknownStructuralVersion { classname: String, version: String },

    #[error("Duplicate {kind} registration: {key}")]
    DuplicateRegistration { kind: &'static str, key: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl PatchError {
    /// Whether the error comes from the data being migrated rather than from
    /// the engine's configuration
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            PatchError::MissingInformation { .. }
                | PatchError::ImpossibleConversion { .. }
                | PatchError::UnknownContextVersion { .. }
        )
    }

    /// Message suitable for the end user of a reader that migrates on load
    pub fn user_message(&self) -> String {
        if self.is_data_error() {
            format!("Unsupported file version: {}", self)
        } else {
            format!("Internal error: {}", self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_errors() {
        let err = PatchError::ImpossibleConversion {
            classname: "Widget".to_string(),
            from: "1".to_string(),
            to: "9".to_string(),
        };
        assert!(err.is_data_error());
        assert!(err.user_message().starts_with("Unsupported file version"));

        let err = PatchError::InvalidConfig("bad".to_string());
        assert!(!err.is_data_error());
        assert_eq!(err.user_message(), "Internal error: Invalid configuration: bad");
    }
}
