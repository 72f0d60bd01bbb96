//! Tamura texture features: roughness, contrast and directionality.

use vizsim_core::Tamura;

use crate::plane::{mean_std, percentile, Plane};

/// Largest window side used for roughness
const MAX_SCALE: usize = 5;
const DIRECTION_BINS: usize = 16;
/// A direction bin counts as a peak above this share of edge pixels
const PEAK_THRESHOLD: f64 = 0.1;
/// Only gradients stronger than this percentile vote for a direction
const EDGE_PERCENTILE: f64 = 75.0;

pub fn tamura(gray: &Plane) -> Tamura {
    Tamura {
        roughness: roughness(gray),
        contrast: contrast(gray),
        directionality: directionality(gray),
    }
}

/// Mean over pixels of the largest local-mean difference found at any
/// window scale in `2..=min(5, min(h, w) / 2)`.
pub fn roughness(gray: &Plane) -> f64 {
    if gray.is_empty() {
        return 0.0;
    }
    let (w, h) = (gray.width, gray.height);
    let max_scale = MAX_SCALE.min(w.min(h) / 2);
    let mut best = vec![0.0f64; gray.len()];

    for s in 2..=max_scale {
        let avg = gray.box_mean(s);
        for y in 0..h {
            let below = (y + s).min(h - 1);
            for x in 0..w {
                let right = (x + s).min(w - 1);
                let here = avg.at(x, y);
                let horizontal = (avg.at(right, y) - here).abs();
                let vertical = (avg.at(x, below) - here).abs();
                let slot = &mut best[y * w + x];
                *slot = slot.max(horizontal).max(vertical);
            }
        }
    }

    best.iter().sum::<f64>() / best.len() as f64
}

/// `stddev / kurtosis^(1/4)`; plain stddev when kurtosis is not positive
pub fn contrast(gray: &Plane) -> f64 {
    let (mean, std) = mean_std(&gray.data);
    if gray.is_empty() {
        return 0.0;
    }
    let var = std * std;
    let m4 = gray.data.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / gray.len() as f64;
    let kurtosis = m4 / (var * var);
    // NaN (flat image) fails this too
    if kurtosis > 0.0 && kurtosis.is_finite() {
        std / kurtosis.powf(0.25)
    } else {
        std
    }
}

/// `1 - peaks / 16` over the angle histogram of strong Sobel edges
pub fn directionality(gray: &Plane) -> f64 {
    if gray.is_empty() {
        return 1.0;
    }
    let (gx, gy) = gray.sobel();
    let magnitude: Vec<f64> = gx
        .data
        .iter()
        .zip(&gy.data)
        .map(|(x, y)| x.hypot(*y))
        .collect();
    let threshold = percentile(&magnitude, EDGE_PERCENTILE);

    let mut hist = [0u64; DIRECTION_BINS];
    for ((m, x), y) in magnitude.iter().zip(&gx.data).zip(&gy.data) {
        if *m > threshold {
            let angle = y.atan2(*x).to_degrees();
            let bin = ((angle + 180.0) / 360.0 * DIRECTION_BINS as f64).floor() as usize;
            hist[bin.min(DIRECTION_BINS - 1)] += 1;
        }
    }

    let total: f64 = hist.iter().map(|&c| c as f64).sum();
    let peaks = hist
        .iter()
        .filter(|&&c| c as f64 / (total + 1e-7) > PEAK_THRESHOLD)
        .count();
    1.0 - peaks as f64 / DIRECTION_BINS as f64
}
