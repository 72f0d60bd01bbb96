//! Extraction parameters.
//!
//! Every field has a default matching the reference descriptor layout, so an
//! empty JSON object deserializes to [`ExtractorConfig::default`].

use serde::{Deserialize, Serialize};
use vizsim_core::{Error, Result};

/// Gabor frequencies, in order; `scales` selects a prefix of this list
pub const GABOR_FREQUENCIES: [f64; 4] = [0.1, 0.2, 0.3, 0.4];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub histogram: HistogramConfig,
    pub dominant: DominantConfig,
    pub gabor: GaborConfig,
    pub hog: HogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramConfig {
    /// Bins per R, G and B histogram
    pub rgb_bins: usize,
    /// Bins over the 8-bit hue range `[0, 180)`
    pub hue_bins: usize,
    pub saturation_bins: usize,
    pub value_bins: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            rgb_bins: 256,
            hue_bins: 180,
            saturation_bins: 256,
            value_bins: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DominantConfig {
    /// Number of clusters
    pub k: usize,
    /// Images above this many pixels are downscaled before clustering
    pub max_pixels: usize,
    pub max_iterations: usize,
    /// Independent k-means runs; the lowest-inertia run wins
    pub attempts: usize,
    /// Stop when no centre moves further than this (RGB units)
    pub epsilon: f64,
    pub seed: u64,
}

impl Default for DominantConfig {
    fn default() -> Self {
        Self {
            k: 5,
            max_pixels: 100_000,
            max_iterations: 100,
            attempts: 3,
            epsilon: 0.2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaborConfig {
    pub orientations: usize,
    /// How many of [`GABOR_FREQUENCIES`] to use (1..=4)
    pub scales: usize,
    /// Square kernel side, odd
    pub kernel_size: usize,
    pub sigma: f64,
    pub gamma: f64,
    pub psi: f64,
}

impl Default for GaborConfig {
    fn default() -> Self {
        Self {
            orientations: 8,
            scales: 4,
            kernel_size: 21,
            sigma: 5.0,
            gamma: 0.5,
            psi: 0.0,
        }
    }
}

impl GaborConfig {
    pub fn frequencies(&self) -> &[f64] {
        &GABOR_FREQUENCIES[..self.scales.min(GABOR_FREQUENCIES.len())]
    }

    /// Length of the gabor vector this config produces
    pub fn vector_len(&self) -> usize {
        2 * self.orientations * self.scales
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HogConfig {
    pub orientations: usize,
    /// Cell side in pixels
    pub cell_size: usize,
    /// Block side in cells
    pub block_size: usize,
}

impl Default for HogConfig {
    fn default() -> Self {
        Self {
            orientations: 9,
            cell_size: 8,
            block_size: 2,
        }
    }
}

impl HogConfig {
    /// HOG vector length for an image of the given size; 0 if no block fits
    pub fn vector_len(&self, width: usize, height: usize) -> usize {
        let cells_x = width / self.cell_size;
        let cells_y = height / self.cell_size;
        if cells_x < self.block_size || cells_y < self.block_size {
            return 0;
        }
        let blocks_x = cells_x - self.block_size + 1;
        let blocks_y = cells_y - self.block_size + 1;
        blocks_x * blocks_y * self.block_size * self.block_size * self.orientations
    }
}

impl ExtractorConfig {
    /// Reject parameters that cannot produce a descriptor
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("histogram.rgb_bins", self.histogram.rgb_bins),
            ("histogram.hue_bins", self.histogram.hue_bins),
            ("histogram.saturation_bins", self.histogram.saturation_bins),
            ("histogram.value_bins", self.histogram.value_bins),
            ("dominant.k", self.dominant.k),
            ("dominant.max_pixels", self.dominant.max_pixels),
            ("dominant.max_iterations", self.dominant.max_iterations),
            ("dominant.attempts", self.dominant.attempts),
            ("gabor.orientations", self.gabor.orientations),
            ("gabor.scales", self.gabor.scales),
            ("gabor.kernel_size", self.gabor.kernel_size),
            ("hog.orientations", self.hog.orientations),
            ("hog.cell_size", self.hog.cell_size),
            ("hog.block_size", self.hog.block_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{} must be positive", name)));
            }
        }

        if self.gabor.scales > GABOR_FREQUENCIES.len() {
            return Err(Error::InvalidConfig(format!(
                "gabor.scales must be at most {}, got {}",
                GABOR_FREQUENCIES.len(),
                self.gabor.scales
            )));
        }
        if self.gabor.kernel_size % 2 == 0 {
            return Err(Error::InvalidConfig(format!(
                "gabor.kernel_size must be odd, got {}",
                self.gabor.kernel_size
            )));
        }
        if !(self.gabor.sigma > 0.0) || !(self.gabor.gamma > 0.0) {
            return Err(Error::InvalidConfig(
                "gabor.sigma and gabor.gamma must be positive".to_string(),
            ));
        }
        if !(self.dominant.epsilon >= 0.0) {
            return Err(Error::InvalidConfig(
                "dominant.epsilon must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ExtractorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.gabor.vector_len(), 64);
        assert_eq!(config.gabor.frequencies(), &[0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_zero_bins_rejected() {
        let mut config = ExtractorConfig::default();
        config.histogram.hue_bins = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("hue_bins"));
    }

    #[test]
    fn test_too_many_scales_rejected() {
        let mut config = ExtractorConfig::default();
        config.gabor.scales = 5;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_even_kernel_rejected() {
        let mut config = ExtractorConfig::default();
        config.gabor.kernel_size = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hog_vector_len() {
        let hog = HogConfig::default();
        // 64x64 -> 8x8 cells -> 7x7 blocks of 2x2x9
        assert_eq!(hog.vector_len(64, 64), 7 * 7 * 36);
        assert_eq!(hog.vector_len(15, 64), 0);
        // Partial cells at the edge are dropped
        assert_eq!(hog.vector_len(23, 16), 36);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ExtractorConfig =
            serde_json::from_str(r#"{"gabor": {"orientations": 4, "scales": 2}}"#).unwrap();
        assert_eq!(config.gabor.vector_len(), 16);
        assert_eq!(config.gabor.kernel_size, 21);
        assert_eq!(config.histogram, HistogramConfig::default());
    }
}
