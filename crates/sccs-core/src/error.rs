//! Error types for SCCS simulation studies.

use thiserror::Error;

/// Simulation error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter combination, detected before any simulation work.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid intermediate numeric state (e.g. non-positive total rate).
    #[error("Domain error: {0}")]
    Domain(String),

    /// The estimator cannot fit a dataset (empty, degenerate, or separated).
    #[error("Fit error: {0}")]
    Fit(String),

    /// A replicate failed; carries the replicate index and the underlying cause.
    #[error("Replicate {index} failed: {source}")]
    Replicate {
        /// Index of the failed replicate.
        index: usize,
        /// Underlying cause.
        source: Box<Error>,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an error with the replicate index it occurred in.
    pub fn in_replicate(self, index: usize) -> Self {
        Error::Replicate { index, source: Box::new(self) }
    }

    /// The index of the failed replicate, if this is a replicate failure.
    pub fn replicate_index(&self) -> Option<usize> {
        match self {
            Error::Replicate { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replicate_wrapper_carries_index() {
        let err = Error::Fit("dataset has no rows".to_string()).in_replicate(17);
        assert_eq!(err.replicate_index(), Some(17));
        let display = format!("{err}");
        assert!(display.contains("Replicate 17"));
        assert!(display.contains("no rows"));
    }

    #[test]
    fn test_non_replicate_has_no_index() {
        let err = Error::Domain("total rate must be > 0".to_string());
        assert_eq!(err.replicate_index(), None);
    }
}
