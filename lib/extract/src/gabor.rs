//! Gabor filter bank responses

use std::f64::consts::PI;

use crate::config::GaborConfig;
use crate::plane::{Plane, FFT_MIN_KERNEL_AREA};

/// Real Gabor kernel, laid out the way OpenCV's `getGaborKernel` lays it out
/// (row-major, both axes flipped).
pub fn gabor_kernel(size: usize, sigma: f64, theta: f64, lambda: f64, gamma: f64, psi: f64) -> Vec<f64> {
    let half = (size / 2) as isize;
    let (s, c) = theta.sin_cos();
    let sigma_y = sigma / gamma;
    let ex = -0.5 / (sigma * sigma);
    let ey = -0.5 / (sigma_y * sigma_y);
    let scale = 2.0 * PI / lambda;

    let mut kernel = vec![0.0; size * size];
    for y in -half..=half {
        for x in -half..=half {
            let xr = x as f64 * c + y as f64 * s;
            let yr = -(x as f64) * s + y as f64 * c;
            let v = (ex * xr * xr + ey * yr * yr).exp() * (scale * xr + psi).cos();
            let row = (half - y) as usize;
            let col = (half - x) as usize;
            kernel[row * size + col] = v;
        }
    }
    kernel
}

/// Mean and standard deviation of each filter response, frequency-major then
/// orientation, as `[mean, std, mean, std, ...]`
pub fn gabor_features(gray: &Plane, config: &GaborConfig) -> Vec<f64> {
    let size = config.kernel_size;
    let mut features = Vec::with_capacity(config.vector_len());
    let correlator = (!gray.is_empty() && size * size >= FFT_MIN_KERNEL_AREA).then(|| gray.correlator(size, size));

    for &frequency in config.frequencies() {
        for o in 0..config.orientations {
            let theta = o as f64 * PI / config.orientations as f64;
            let kernel = gabor_kernel(size, config.sigma, theta, 1.0 / frequency, config.gamma, config.psi);
            let response = match &correlator {
                Some(correlator) => correlator.correlate(&kernel),
                None => gray.filter(&kernel, size, size),
            };
            let (mean, std) = response.mean_std();
            features.push(mean);
            features.push(std);
        }
    }
    features
}
