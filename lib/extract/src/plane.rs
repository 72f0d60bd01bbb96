//! Single-channel float image and the filtering primitives the texture
//! descriptors are built on.

use std::sync::Arc;

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftDirection, FftPlanner};
use vizsim_core::Raster;

/// Kernels with at least this many taps are applied in the frequency domain
pub const FFT_MIN_KERNEL_AREA: usize = 121;

/// Row-major grayscale image with `f64` intensities in `[0, 255]`
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Plane {
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { width, height, data }
    }

    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        Self::new(width, height, vec![value; width * height])
    }

    /// Luma conversion `0.299 R + 0.587 G + 0.114 B`, rounded to 8-bit levels
    pub fn from_raster(image: &Raster) -> Self {
        let data = image
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round()
            })
            .collect();
        Self::new(image.width() as usize, image.height() as usize, data)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    /// Population mean and standard deviation
    pub fn mean_std(&self) -> (f64, f64) {
        mean_std(&self.data)
    }

    /// Correlate with a `kw x kh` kernel anchored at its centre, mirroring
    /// the border without repeating the edge pixel.
    ///
    /// Large kernels go through the frequency domain; small ones are applied
    /// directly.
    pub fn filter(&self, kernel: &[f64], kw: usize, kh: usize) -> Plane {
        debug_assert_eq!(kernel.len(), kw * kh);
        if self.is_empty() || kw * kh < FFT_MIN_KERNEL_AREA {
            self.filter_direct(kernel, kw, kh)
        } else {
            self.correlator(kw, kh).correlate(kernel)
        }
    }

    /// Frequency-domain correlator for many `kw x kh` kernels over this plane.
    /// The plane's spectrum is computed once and shared by every kernel.
    pub fn correlator(&self, kw: usize, kh: usize) -> Correlator {
        Correlator::new(self, kw, kh)
    }

    fn filter_direct(&self, kernel: &[f64], kw: usize, kh: usize) -> Plane {
        if self.is_empty() {
            return self.clone();
        }
        let (ax, ay) = ((kw / 2) as isize, (kh / 2) as isize);
        let xs = reflected_indices(self.width, kw, ax);
        let ys = reflected_indices(self.height, kh, ay);
        let mut out = vec![0.0; self.len()];

        out.par_chunks_mut(self.width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, value) in row.iter_mut().enumerate() {
                    let mut acc = 0.0;
                    for (ky, &sy) in ys[y..y + kh].iter().enumerate() {
                        let src = &self.data[sy * self.width..(sy + 1) * self.width];
                        let krow = &kernel[ky * kw..(ky + 1) * kw];
                        for (k, &sx) in krow.iter().zip(&xs[x..x + kw]) {
                            acc += k * src[sx];
                        }
                    }
                    *value = acc;
                }
            });

        Plane::new(self.width, self.height, out)
    }

    /// `s x s` local mean
    pub fn box_mean(&self, s: usize) -> Plane {
        let kernel = vec![1.0 / (s * s) as f64; s * s];
        self.filter(&kernel, s, s)
    }

    /// 3x3 Sobel derivatives `(d/dx, d/dy)`
    pub fn sobel(&self) -> (Plane, Plane) {
        const GX: [f64; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
        const GY: [f64; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];
        (self.filter(&GX, 3, 3), self.filter(&GY, 3, 3))
    }
}

/// Source index for every padded position `0..n + k - 1`, anchor `a`
fn reflected_indices(n: usize, k: usize, a: isize) -> Vec<usize> {
    (0..n + k - 1).map(|i| reflect101(i as isize - a, n)).collect()
}

/// Applies kernels of one size to one plane by pointwise products of spectra.
///
/// The plane is padded with its mirrored border and both it and each kernel
/// are zero-extended to a transform size made of small primes. The valid
/// part of the circular correlation never wraps, so results match
/// [`Plane::filter`] up to rounding.
pub struct Correlator {
    width: usize,
    height: usize,
    kw: usize,
    kh: usize,
    forward: Fft2,
    inverse: Fft2,
    spectrum: Vec<Complex<f64>>,
}

impl Correlator {
    fn new(plane: &Plane, kw: usize, kh: usize) -> Self {
        let (pw, ph) = (plane.width + kw - 1, plane.height + kh - 1);
        let (cols, rows) = (fft_len(pw), fft_len(ph));
        let mut planner = FftPlanner::new();
        let forward = Fft2::new(&mut planner, cols, rows, FftDirection::Forward);
        let inverse = Fft2::new(&mut planner, cols, rows, FftDirection::Inverse);

        let xs = reflected_indices(plane.width, kw, (kw / 2) as isize);
        let ys = reflected_indices(plane.height, kh, (kh / 2) as isize);
        let mut spectrum = vec![Complex::default(); cols * rows];
        for (py, &sy) in ys.iter().enumerate() {
            for (px, &sx) in xs.iter().enumerate() {
                spectrum[py * cols + px] = Complex::new(plane.at(sx, sy), 0.0);
            }
        }
        forward.process(&mut spectrum);

        Self {
            width: plane.width,
            height: plane.height,
            kw,
            kh,
            forward,
            inverse,
            spectrum,
        }
    }

    pub fn correlate(&self, kernel: &[f64]) -> Plane {
        debug_assert_eq!(kernel.len(), self.kw * self.kh);
        let cols = self.forward.cols;
        let mut buffer = vec![Complex::default(); self.spectrum.len()];
        for (ky, krow) in kernel.chunks(self.kw).enumerate() {
            for (kx, &k) in krow.iter().enumerate() {
                buffer[ky * cols + kx] = Complex::new(k, 0.0);
            }
        }
        self.forward.process(&mut buffer);
        buffer
            .par_iter_mut()
            .zip(self.spectrum.par_iter())
            .for_each(|(k, p)| *k = *p * k.conj());
        self.inverse.process(&mut buffer);

        let scale = 1.0 / buffer.len() as f64;
        let data = buffer
            .chunks(cols)
            .take(self.height)
            .flat_map(|row| row[..self.width].iter().map(|c| c.re * scale))
            .collect();
        Plane::new(self.width, self.height, data)
    }
}

/// Row-then-column 2-D transform over a row-major `cols x rows` buffer
struct Fft2 {
    cols: usize,
    rows: usize,
    row: Arc<dyn Fft<f64>>,
    col: Arc<dyn Fft<f64>>,
}

impl Fft2 {
    fn new(planner: &mut FftPlanner<f64>, cols: usize, rows: usize, direction: FftDirection) -> Self {
        Self {
            cols,
            rows,
            row: planner.plan_fft(cols, direction),
            col: planner.plan_fft(rows, direction),
        }
    }

    fn process(&self, data: &mut Vec<Complex<f64>>) {
        data.par_chunks_mut(self.cols).for_each(|row| self.row.process(row));
        let mut transposed = transpose(data, self.cols, self.rows);
        transposed
            .par_chunks_mut(self.rows)
            .for_each(|col| self.col.process(col));
        *data = transpose(&transposed, self.rows, self.cols);
    }
}

fn transpose(data: &[Complex<f64>], cols: usize, rows: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::default(); data.len()];
    for (y, row) in data.chunks(cols).enumerate() {
        for (x, &v) in row.iter().enumerate() {
            out[x * rows + y] = v;
        }
    }
    out
}

/// Smallest length `>= n` whose only prime factors are 2, 3 and 5
fn fft_len(n: usize) -> usize {
    let smooth = |mut m: usize| {
        for p in [2, 3, 5] {
            while m % p == 0 {
                m /= p;
            }
        }
        m == 1
    };
    (n.max(1)..).find(|&m| smooth(m)).unwrap_or(n)
}

/// Mirror an out-of-range index back into `[0, n)`: `-1 -> 1`, `n -> n - 2`
#[inline]
pub fn reflect101(i: isize, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    while i < 0 || i >= n {
        if i < 0 {
            i = -i;
        }
        if i >= n {
            i = 2 * n - 2 - i;
        }
    }
    i as usize
}

pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Percentile with linear interpolation between closest ranks.
/// `q` is in `[0, 100]`.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(3, 5), 3);
        assert_eq!(reflect101(-3, 1), 0);
        // Wider than the image bounces more than once
        assert_eq!(reflect101(-5, 3), 1);
    }

    #[test]
    fn test_luma() {
        let image = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        let plane = Plane::from_raster(&image);
        assert_eq!(plane.data, vec![76.0; 4]);
    }

    #[test]
    fn test_box_mean_of_constant() {
        let plane = Plane::filled(7, 5, 42.0);
        for s in 2..=5 {
            let mean = plane.box_mean(s);
            assert!(mean.data.iter().all(|v| (v - 42.0).abs() < 1e-9));
        }
    }

    #[test]
    fn test_sobel_on_ramp() {
        // Intensity grows by 1 per column
        let data = (0..5).flat_map(|_| (0..6).map(|x| x as f64)).collect();
        let plane = Plane::new(6, 5, data);
        let (gx, gy) = plane.sobel();
        // Interior: (1*1 + 2*1 + 1*1) * 2 = 8
        assert!((gx.at(2, 2) - 8.0).abs() < 1e-9);
        assert!(gy.at(2, 2).abs() < 1e-9);
    }

    fn noise(width: usize, height: usize) -> Plane {
        let data = (0..width * height).map(|i| ((i * 7919) % 251) as f64).collect();
        Plane::new(width, height, data)
    }

    #[test]
    fn test_fft_len() {
        assert_eq!(fft_len(1), 1);
        assert_eq!(fft_len(7), 8);
        assert_eq!(fft_len(11), 12);
        assert_eq!(fft_len(31), 32);
        assert_eq!(fft_len(1044), 1080);
    }

    #[test]
    fn test_frequency_domain_matches_direct() {
        let kernel: Vec<f64> = (0..21 * 15).map(|i| ((i * 31) % 17) as f64 / 17.0 - 0.5).collect();
        // Larger than the kernel, smaller than the kernel, and a single row
        for plane in [noise(37, 29), noise(6, 9), noise(40, 1)] {
            let direct = plane.filter_direct(&kernel, 21, 15);
            let fast = plane.correlator(21, 15).correlate(&kernel);
            assert_eq!((fast.width, fast.height), (direct.width, direct.height));
            for (a, b) in fast.data.iter().zip(&direct.data) {
                assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_filter_dispatches_on_kernel_size() {
        let plane = noise(30, 20);
        let kernel = vec![1.0 / 121.0; 121];
        let via_filter = plane.filter(&kernel, 11, 11);
        let direct = plane.filter_direct(&kernel, 11, 11);
        for (a, b) in via_filter.data.iter().zip(&direct.data) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 75.0) - 3.25).abs() < 1e-12);
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 4.0);
    }

    #[test]
    fn test_mean_std() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 2.0).abs() < 1e-12);
    }
}
