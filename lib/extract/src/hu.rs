//! Hu's seven moment invariants with a sign-preserving log scale

use crate::plane::Plane;

const LOG_EPSILON: f64 = 1e-10;

/// Raw Hu invariants of the intensity distribution
pub fn hu_invariants(gray: &Plane) -> [f64; 7] {
    let (w, h) = (gray.width, gray.height);
    let (mut m00, mut m10, mut m01) = (0.0, 0.0, 0.0);
    for y in 0..h {
        for x in 0..w {
            let v = gray.at(x, y);
            m00 += v;
            m10 += x as f64 * v;
            m01 += y as f64 * v;
        }
    }
    if m00 == 0.0 {
        return [0.0; 7];
    }
    let (cx, cy) = (m10 / m00, m01 / m00);

    let (mut mu20, mut mu02, mut mu11) = (0.0, 0.0, 0.0);
    let (mut mu30, mut mu03, mut mu21, mut mu12) = (0.0, 0.0, 0.0, 0.0);
    for y in 0..h {
        let dy = y as f64 - cy;
        for x in 0..w {
            let v = gray.at(x, y);
            let dx = x as f64 - cx;
            mu20 += dx * dx * v;
            mu02 += dy * dy * v;
            mu11 += dx * dy * v;
            mu30 += dx * dx * dx * v;
            mu03 += dy * dy * dy * v;
            mu21 += dx * dx * dy * v;
            mu12 += dx * dy * dy * v;
        }
    }

    // Scale normalisation: mu_pq / m00^(1 + (p + q) / 2)
    let s2 = m00 * m00;
    let s3 = s2 * m00.sqrt();
    let (n20, n02, n11) = (mu20 / s2, mu02 / s2, mu11 / s2);
    let (n30, n03, n21, n12) = (mu30 / s3, mu03 / s3, mu21 / s3, mu12 / s3);

    let a = n30 + n12;
    let b = n21 + n03;
    [
        n20 + n02,
        (n20 - n02).powi(2) + 4.0 * n11 * n11,
        (n30 - 3.0 * n12).powi(2) + (3.0 * n21 - n03).powi(2),
        a * a + b * b,
        (n30 - 3.0 * n12) * a * (a * a - 3.0 * b * b) + (3.0 * n21 - n03) * b * (3.0 * a * a - b * b),
        (n20 - n02) * (a * a - b * b) + 4.0 * n11 * a * b,
        (3.0 * n21 - n03) * a * (a * a - 3.0 * b * b) - (n30 - 3.0 * n12) * b * (3.0 * a * a - b * b),
    ]
}

/// `-sign(v) * log10(|v| + 1e-10)` for each invariant
pub fn hu_moments(gray: &Plane) -> Vec<f64> {
    hu_invariants(gray).iter().map(|&v| log_scale(v)).collect()
}

#[inline]
fn log_scale(v: f64) -> f64 {
    if v == 0.0 {
        return 0.0;
    }
    -v.signum() * (v.abs() + LOG_EPSILON).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(width: usize, height: usize, x0: usize, y0: usize, bw: usize, bh: usize) -> Plane {
        let data = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| {
                    if x >= x0 && x < x0 + bw && y >= y0 && y < y0 + bh {
                        255.0
                    } else {
                        0.0
                    }
                })
            })
            .collect();
        Plane::new(width, height, data)
    }

    #[test]
    fn test_always_seven() {
        assert_eq!(hu_moments(&blob(20, 20, 3, 3, 5, 9)).len(), 7);
        assert_eq!(hu_moments(&Plane::filled(1, 1, 10.0)).len(), 7);
    }

    #[test]
    fn test_black_image_is_zero() {
        assert_eq!(hu_moments(&Plane::filled(8, 8, 0.0)), vec![0.0; 7]);
    }

    #[test]
    fn test_translation_invariant() {
        let a = hu_moments(&blob(40, 40, 2, 4, 6, 12));
        let b = hu_moments(&blob(40, 40, 20, 15, 6, 12));
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_transpose_keeps_first_invariant() {
        // A 90 degree rotation swaps n20 and n02
        let a = hu_invariants(&blob(30, 30, 5, 5, 4, 14));
        let b = hu_invariants(&blob(30, 30, 5, 5, 14, 4));
        assert!((a[0] - b[0]).abs() < 1e-12);
        assert!((a[1] - b[1]).abs() < 1e-12);
    }

    #[test]
    fn test_log_scale_sign() {
        assert!((log_scale(1e-3) - 3.0).abs() < 1e-6);
        assert!((log_scale(-1e-3) + 3.0).abs() < 1e-6);
        assert_eq!(log_scale(0.0), 0.0);
    }
}
