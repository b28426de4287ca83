//! Harness error types.

use gossip_core::{ConfigError, OverlayError};
use thiserror::Error;

/// Errors that stop a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Overlay(OverlayError),

    #[error("Invalid harness setting: {0}")]
    Settings(String),

    #[error("Failed to write report: {0}")]
    Export(#[from] std::io::Error),

    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<OverlayError> for SimError {
    fn from(err: OverlayError) -> Self {
        match err {
            OverlayError::InvalidConfig(config) => SimError::Config(config),
            other => SimError::Overlay(other),
        }
    }
}

impl SimError {
    /// Process exit code for this error.
    ///
    /// Rejected parameters exit with 2 before any node starts; anything
    /// that fails mid-run exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            SimError::Config(_) | SimError::Settings(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gossip_env::NodeId;

    #[test]
    fn test_config_errors_exit_distinctly() {
        let err: SimError = OverlayError::InvalidConfig(ConfigError::ZeroFanout).into();
        assert!(matches!(err, SimError::Config(ConfigError::ZeroFanout)));
        assert_eq!(err.exit_code(), 2);

        let err: SimError = OverlayError::NodeUnavailable(NodeId(1)).into();
        assert_eq!(err.exit_code(), 1);
    }
}
