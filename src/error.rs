use thiserror::Error;

/// Result type for duel operations
pub type Result<T> = std::result::Result<T, DuelError>;

/// Main error type for the duel crate
#[derive(Error, Debug)]
pub enum DuelError {
    /// Unsupported choice or out-of-range value in the run configuration
    #[error("Invalid configuration '{name}': {reason}")]
    InvalidConfiguration {
        name: String,
        reason: String,
    },

    /// Sampling requested more transitions than the replay buffer holds
    #[error("Insufficient replay data: requested {requested}, only {available} stored")]
    InsufficientReplayData {
        requested: usize,
        available: usize,
    },

    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Array reshaping failed
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Failure reported by an environment
    #[error("Environment error: {0}")]
    Environment(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV sink errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for DuelError {
    fn from(err: bincode::Error) -> Self {
        DuelError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DuelError {
    fn from(err: serde_json::Error) -> Self {
        DuelError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl DuelError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DuelError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_configuration<S: Into<String>>(name: S, reason: S) -> Self {
        DuelError::InvalidConfiguration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for the one condition the training loop recovers from.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, DuelError::InsufficientReplayData { .. })
    }
}
