//! # sccs-core
//!
//! Core types for SCCS (Self-Controlled Case Series) simulation studies:
//! the error taxonomy, the canonical long-format dataset, the fit-result
//! contract, and the fitter capability trait.
//!
//! Higher layers (`sccs-engine`) depend on the [`traits::SccsFitter`]
//! contract, not on a concrete solver implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error taxonomy: configuration, domain, fit, and per-replicate failures.
pub mod error;
/// Fitter capability trait.
pub mod traits;
/// Canonical dataset and fit-result types.
pub mod types;

pub use error::{Error, Result};
pub use traits::SccsFitter;
pub use types::{EventRow, FitResult, SccsDataset};
