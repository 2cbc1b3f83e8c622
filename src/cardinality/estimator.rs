//! Improved cardinality estimator
//!
//! Implements the estimator of Ertl, "New cardinality estimation
//! algorithms for HyperLogLog sketches" (arXiv:1702.01284). The σ and τ
//! series absorb the classical small- and large-range corrections, so the
//! estimate is a single formula over the register-value histogram.

use super::histogram::RegisterHistogram;

/// Bias-correction constant for the Ertl estimator
const ALPHA: f64 = 0.7213475;

/// σ series: Σ x^(2^k) · 2^k, iterated to its fixed point in f64.
///
/// σ(1) diverges; it is mapped to +∞ so an all-zero sketch estimates 0.
pub(crate) fn sigma(x: f64) -> f64 {
    if x == 1.0 {
        return f64::INFINITY;
    }
    let mut x = x;
    let mut y = 1.0f64;
    let mut z = x;
    loop {
        x *= x;
        let z_prev = z;
        z += x * y;
        y += y;
        if z == z_prev {
            return z;
        }
    }
}

/// τ series, iterated to its fixed point in f64; τ(0) = τ(1) = 0.
pub(crate) fn tau(x: f64) -> f64 {
    if x == 0.0 || x == 1.0 {
        return 0.0;
    }
    let mut x = x;
    let mut y = 1.0f64;
    let mut z = 1.0 - x;
    loop {
        x = x.sqrt();
        let z_prev = z;
        y *= 0.5;
        z -= (1.0 - x).powi(2) * y;
        if z == z_prev {
            return z / 3.0;
        }
    }
}

/// Cardinality estimate for a sketch with the given histogram and precision.
pub(crate) fn estimate(histogram: &RegisterHistogram, precision: u8) -> f64 {
    let m = (1u64 << precision) as f64;
    let counts = histogram.counts();

    let mut z = m * tau((m - counts[precision as usize + 1] as f64) / m);
    for k in (1..=64 - precision as usize).rev() {
        z += counts[k] as f64;
        z *= 0.5;
    }
    z += m * sigma(counts[0] as f64 / m);

    ALPHA * m * (m / z)
}
