//! RGB and HSV intensity histograms

use vizsim_core::{ColorHistogram, Raster};

use crate::config::HistogramConfig;

/// Added to the histogram mass before dividing so near-empty inputs still
/// produce a distribution
const NORM_EPSILON: f64 = 1e-7;

pub fn rgb_histogram(image: &Raster, config: &HistogramConfig) -> ColorHistogram {
    let bins = config.rgb_bins;
    let mut counts = [vec![0u64; bins], vec![0u64; bins], vec![0u64; bins]];
    for p in image.pixels() {
        for (c, &v) in p.0.iter().enumerate() {
            counts[c][bin_of(v as usize, 256, bins)] += 1;
        }
    }
    let [r, g, b] = counts;
    ColorHistogram::new(normalize(&r), normalize(&g), normalize(&b))
}

pub fn hsv_histogram(image: &Raster, config: &HistogramConfig) -> ColorHistogram {
    let mut h = vec![0u64; config.hue_bins];
    let mut s = vec![0u64; config.saturation_bins];
    let mut v = vec![0u64; config.value_bins];
    for p in image.pixels() {
        let [hue, sat, val] = rgb_to_hsv(p.0);
        h[bin_of(hue as usize, 180, config.hue_bins)] += 1;
        s[bin_of(sat as usize, 256, config.saturation_bins)] += 1;
        v[bin_of(val as usize, 256, config.value_bins)] += 1;
    }
    ColorHistogram::new(normalize(&h), normalize(&s), normalize(&v))
}

/// 8-bit HSV: hue in `[0, 180)` (degrees halved), saturation and value in `[0, 255]`
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f64);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let sat = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    let hue8 = ((hue / 2.0).round() as u32 % 180) as u8;
    [hue8, sat.round() as u8, max as u8]
}

#[inline]
fn bin_of(value: usize, range: usize, bins: usize) -> usize {
    (value * bins / range).min(bins - 1)
}

fn normalize(counts: &[u64]) -> Vec<f64> {
    let sum: f64 = counts.iter().map(|&c| c as f64).sum();
    counts.iter().map(|&c| c as f64 / (sum + NORM_EPSILON)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn assert_sums_to_one(hist: &ColorHistogram) {
        for sum in hist.sums() {
            assert!((sum - 1.0).abs() < 1e-6, "sum was {}", sum);
        }
    }

    #[test]
    fn test_rgb_histogram_uniform() {
        let image = RgbImage::from_pixel(10, 10, Rgb([10, 128, 255]));
        let hist = rgb_histogram(&image, &HistogramConfig::default());
        assert_sums_to_one(&hist);
        assert!(hist.channels[0][10] > 0.999);
        assert!(hist.channels[1][128] > 0.999);
        assert!(hist.channels[2][255] > 0.999);
    }

    #[test]
    fn test_single_pixel() {
        let image = RgbImage::from_pixel(1, 1, Rgb([1, 2, 3]));
        let config = HistogramConfig::default();
        assert_sums_to_one(&rgb_histogram(&image, &config));
        assert_sums_to_one(&hsv_histogram(&image, &config));
    }

    #[test]
    fn test_custom_bin_counts() {
        let image = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 0]));
        let config = HistogramConfig {
            rgb_bins: 8,
            hue_bins: 30,
            saturation_bins: 4,
            value_bins: 4,
        };
        let rgb = rgb_histogram(&image, &config);
        assert!(rgb.channels.iter().all(|c| c.len() == 8));
        assert_sums_to_one(&rgb);
        // Red ramps evenly over all 8 bins
        assert!(rgb.channels[0].iter().all(|v| (v - 0.125).abs() < 1e-6));

        let hsv = hsv_histogram(&image, &config);
        assert_eq!(hsv.channels[0].len(), 30);
        assert_eq!(hsv.channels[1].len(), 4);
        assert_sums_to_one(&hsv);
    }

    #[test]
    fn test_rgb_to_hsv() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
        // Magenta-ish hue near 300 degrees
        assert_eq!(rgb_to_hsv([255, 0, 255]), [150, 255, 255]);
    }
}
