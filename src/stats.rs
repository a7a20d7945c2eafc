//! # Statistics
//! Dispersion over a window of price observations.
//!
//! The engine keeps full precision; callers round with [`round2`] when they
//! report a value outward.

/// Population standard deviation (divides by N, not N-1).
///
/// An empty window yields `0.0` so callers with no history need no branch.
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Round half away from zero to 2 decimal digits.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
