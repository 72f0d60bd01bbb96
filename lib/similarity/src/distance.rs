//! Per-channel distance functions.
//!
//! Every function returns a distance (0.0 means identical) or the reason the
//! pair cannot be compared. A skipped pair drops out of the weighted score
//! together with its weight; it is never an error for the caller.

use serde::{Deserialize, Serialize};
use vizsim_core::DominantColor;

/// Divisor applied to the Euclidean distance between Tamura triads
pub const TAMURA_SCALE: f64 = 10.0;

/// Divisor applied to the Euclidean distance between Hu moment vectors
pub const HU_SCALE: f64 = 10.0;

const CHI_SQUARE_EPSILON: f64 = 1e-10;

/// Largest possible distance between two RGB colors
pub const MAX_RGB_DISTANCE: f64 = 441.672_955_930_063_7; // 255 * sqrt(3)

/// Why a channel did not contribute to a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Absent from at least one of the two sets
    Missing,
    /// Weighted zero, not computed
    ZeroWeight,
    /// Histogram bin counts differ
    LengthMismatch { left: usize, right: usize },
    /// Nothing left to compare after truncation
    Empty,
    /// One of the vectors has zero magnitude
    ZeroNorm,
    /// The inputs produced NaN or infinity
    NonFinite,
}

pub type Distance = std::result::Result<f64, SkipReason>;

/// `Σ (a - b)² / (a + b + ε)` over two histograms of equal length
pub fn chi_square(a: &[f64], b: &[f64]) -> Distance {
    if a.len() != b.len() {
        return Err(SkipReason::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Err(SkipReason::Empty);
    }
    let d = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff / (x + y + CHI_SQUARE_EPSILON)
        })
        .sum();
    finite(d)
}

/// Euclidean distance over the common prefix of `a` and `b`
pub fn euclidean(a: &[f64], b: &[f64]) -> Distance {
    let n = a.len().min(b.len());
    if n == 0 {
        return Err(SkipReason::Empty);
    }
    let d = a[..n]
        .iter()
        .zip(&b[..n])
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt();
    finite(d)
}

/// `1 - cos(a, b)` over the common prefix of `a` and `b`, within `[0, 2]`
pub fn cosine_distance(a: &[f64], b: &[f64]) -> Distance {
    let n = a.len().min(b.len());
    if n == 0 {
        return Err(SkipReason::Empty);
    }
    let (a, b) = (&a[..n], &b[..n]);

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(SkipReason::ZeroNorm);
    }
    // sqrt of the product keeps identical vectors at exactly 0.0
    finite((1.0 - dot / (norm_a * norm_b).sqrt()).clamp(0.0, 2.0))
}

/// Mean distance from each color of `a` to its nearest color in `b`,
/// scaled into `[0, 1]`.
///
/// This is a greedy nearest-neighbour average, so it is not symmetric:
/// `dominant_color_distance(a, b)` and `dominant_color_distance(b, a)`
/// generally differ.
pub fn dominant_color_distance(a: &[DominantColor], b: &[DominantColor]) -> Distance {
    if a.is_empty() || b.is_empty() {
        return Err(SkipReason::Empty);
    }
    let total: f64 = a
        .iter()
        .map(|ca| {
            let ca = ca.as_f64();
            b.iter()
                .map(|cb| rgb_distance(&ca, &cb.as_f64()))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();
    finite(total / a.len() as f64 / MAX_RGB_DISTANCE)
}

#[inline]
fn rgb_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    (dr * dr + dg * dg + db * db).sqrt()
}

#[inline]
fn finite(d: f64) -> Distance {
    if d.is_finite() {
        Ok(d)
    } else {
        Err(SkipReason::NonFinite)
    }
}
