//! Probability building blocks for SCCS simulation studies.
//!
//! This crate hosts the sampling math the generative models share:
//! - numerically stable logit/sigmoid primitives,
//! - zero-truncated Poisson sampling,
//! - multinomial allocation via conditional binomials.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod math;
pub mod multinomial;
pub mod truncated_poisson;

pub use multinomial::sample_multinomial;
pub use truncated_poisson::ZeroTruncatedPoisson;
