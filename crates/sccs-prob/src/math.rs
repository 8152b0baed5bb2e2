//! Small numerically-stable math utilities used across the sampling code.

use sccs_core::{Error, Result};

/// Stable sigmoid: `1 / (1 + exp(-x))`.
///
/// Single `exp(-|x|)` so neither tail overflows.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    let e = (-x.abs()).exp();
    let recip = 1.0 / (1.0 + e);
    // x >= 0: 1/(1+exp(-x)); x < 0: exp(x)/(1+exp(x)) = e/(1+e)
    if x >= 0.0 { recip } else { e * recip }
}

/// Stable `log(1 + exp(x))`.
#[inline]
pub fn log1pexp(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

/// Logit: `ln(p / (1 - p))`, the inverse of [`sigmoid`].
///
/// Requires `p` strictly inside `(0, 1)`.
pub fn logit(p: f64) -> Result<f64> {
    if !p.is_finite() || p <= 0.0 || p >= 1.0 {
        return Err(Error::Domain(format!("logit requires p in (0, 1), got {p}")));
    }
    Ok((p / (1.0 - p)).ln())
}
