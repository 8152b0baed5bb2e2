//! Core traits for SCCS simulation studies.
//!
//! The estimator is defined as a capability trait so the replication engine
//! depends on the fit contract, not on a concrete solver. Any compliant
//! conditional Poisson implementation can substitute, and contract tests on
//! known-answer datasets verify compliance.

use crate::types::{FitResult, SccsDataset};
use crate::Result;

/// A conditional Poisson solver for SCCS datasets.
///
/// Implementations must be deterministic given the input dataset and fail with
/// [`crate::Error::Fit`] on an empty dataset or a subject with zero total
/// observation time.
pub trait SccsFitter: Send + Sync {
    /// Fit one dataset and extract the effect estimate.
    fn fit(&self, dataset: &SccsDataset) -> Result<FitResult>;

    /// Solver name, for diagnostics.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct RejectAll;

    impl SccsFitter for RejectAll {
        fn fit(&self, _dataset: &SccsDataset) -> Result<FitResult> {
            Err(Error::Fit("not implemented".to_string()))
        }

        fn name(&self) -> &str {
            "RejectAll"
        }
    }

    #[test]
    fn test_trait_object_usable() {
        let fitter: &dyn SccsFitter = &RejectAll;
        assert_eq!(fitter.name(), "RejectAll");
        assert!(fitter.fit(&SccsDataset::default()).is_err());
    }
}
