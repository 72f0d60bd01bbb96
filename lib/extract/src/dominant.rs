//! Dominant colors by seeded k-means over RGB pixels.
//!
//! Seeding, iteration budget and attempt count are all fixed by
//! [`DominantConfig`], so the same image always yields the same palette.

use image::imageops::{self, FilterType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vizsim_core::{DominantColor, Raster};

use crate::config::DominantConfig;

type Rgb = [f64; 3];

pub fn dominant_colors(image: &Raster, config: &DominantConfig) -> Vec<DominantColor> {
    let pixels = sample_pixels(image, config.max_pixels);
    if pixels.is_empty() {
        return Vec::new();
    }
    let k = config.k.min(pixels.len());

    let mut best: Option<Clustering> = None;
    for attempt in 0..config.attempts {
        let seed = config.seed.wrapping_add(attempt as u64);
        let run = kmeans(&pixels, k, config.max_iterations, config.epsilon, seed);
        if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
            best = Some(run);
        }
    }
    let Some(best) = best else {
        return Vec::new();
    };

    let total = pixels.len() as f64;
    let mut colors: Vec<DominantColor> = best
        .centers
        .iter()
        .zip(&best.counts)
        .filter(|(_, count)| **count > 0)
        .map(|(center, &count)| {
            let rgb = center.map(|c| c.round().clamp(0.0, 255.0) as u8);
            DominantColor::new(rgb, count as f64 / total)
        })
        .collect();

    colors.sort_by(|a, b| b.proportion.total_cmp(&a.proportion));
    colors
}

/// Pixels as float triples, downscaled by `sqrt(max_pixels / n)` when the
/// image is larger than `max_pixels`
fn sample_pixels(image: &Raster, max_pixels: usize) -> Vec<Rgb> {
    let (w, h) = image.dimensions();
    let n = w as usize * h as usize;
    let to_rgb = |p: &image::Rgb<u8>| p.0.map(|c| c as f64);

    if n > max_pixels {
        let scale = (max_pixels as f64 / n as f64).sqrt();
        let nw = ((w as f64 * scale) as u32).max(1);
        let nh = ((h as f64 * scale) as u32).max(1);
        let small = imageops::resize(image, nw, nh, FilterType::Triangle);
        small.pixels().map(to_rgb).collect()
    } else {
        image.pixels().map(to_rgb).collect()
    }
}

struct Clustering {
    centers: Vec<Rgb>,
    counts: Vec<usize>,
    inertia: f64,
}

fn kmeans(points: &[Rgb], k: usize, max_iterations: usize, epsilon: f64, seed: u64) -> Clustering {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centers = kmeans_plus_plus(points, k, &mut rng);
    let mut labels = vec![0usize; points.len()];

    for _ in 0..max_iterations {
        assign(points, &centers, &mut labels);

        let mut sums = vec![[0.0; 3]; k];
        let mut counts = vec![0usize; k];
        for (p, &l) in points.iter().zip(&labels) {
            for c in 0..3 {
                sums[l][c] += p[c];
            }
            counts[l] += 1;
        }

        let mut shift: f64 = 0.0;
        for i in 0..k {
            // Empty clusters keep their previous centre
            if counts[i] == 0 {
                continue;
            }
            let next = sums[i].map(|s| s / counts[i] as f64);
            shift = shift.max(dist2(&next, &centers[i]).sqrt());
            centers[i] = next;
        }
        if shift <= epsilon {
            break;
        }
    }

    let inertia = assign(points, &centers, &mut labels);
    let mut counts = vec![0usize; k];
    for &l in &labels {
        counts[l] += 1;
    }
    Clustering {
        centers,
        counts,
        inertia,
    }
}

/// D²-weighted seeding
fn kmeans_plus_plus(points: &[Rgb], k: usize, rng: &mut StdRng) -> Vec<Rgb> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.random_range(0..points.len())]);
    let mut nearest: Vec<f64> = points.iter().map(|p| dist2(p, &centers[0])).collect();

    while centers.len() < k {
        let total: f64 = nearest.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (i, d) in nearest.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            points[chosen]
        } else {
            // Every point coincides with a centre already
            points[rng.random_range(0..points.len())]
        };
        for (d, p) in nearest.iter_mut().zip(points) {
            *d = d.min(dist2(p, &next));
        }
        centers.push(next);
    }
    centers
}

/// Label each point with its nearest centre; returns the summed squared distance
fn assign(points: &[Rgb], centers: &[Rgb], labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0;
    for (p, label) in points.iter().zip(labels.iter_mut()) {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (i, c) in centers.iter().enumerate() {
            let d = dist2(p, c);
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        *label = best;
        inertia += best_d;
    }
    inertia
}

#[inline]
fn dist2(a: &Rgb, b: &Rgb) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb as Px, RgbImage};

    fn two_tone() -> RgbImage {
        // Left 3/4 red, right 1/4 blue
        RgbImage::from_fn(40, 10, |x, _| {
            if x < 30 {
                Px([250, 10, 10])
            } else {
                Px([10, 10, 250])
            }
        })
    }

    #[test]
    fn test_two_tone_palette() {
        let config = DominantConfig {
            k: 2,
            ..Default::default()
        };
        let colors = dominant_colors(&two_tone(), &config);
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0].rgb, [250, 10, 10]);
        assert!((colors[0].proportion - 0.75).abs() < 1e-9);
        assert_eq!(colors[1].rgb, [10, 10, 250]);
        assert!((colors[1].proportion - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_proportions_sum_to_one_and_sorted() {
        let image = RgbImage::from_fn(32, 32, |x, y| Px([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8]));
        let colors = dominant_colors(&image, &DominantConfig::default());
        assert!(!colors.is_empty() && colors.len() <= 5);
        let total: f64 = colors.iter().map(|c| c.proportion).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(colors.windows(2).all(|w| w[0].proportion >= w[1].proportion));
    }

    #[test]
    fn test_deterministic() {
        let image = RgbImage::from_fn(24, 24, |x, y| Px([(x * 10) as u8, (y * 10) as u8, 77]));
        let config = DominantConfig::default();
        assert_eq!(dominant_colors(&image, &config), dominant_colors(&image, &config));
    }

    #[test]
    fn test_uniform_image_collapses() {
        let image = RgbImage::from_pixel(8, 8, Px([5, 6, 7]));
        let colors = dominant_colors(&image, &DominantConfig::default());
        let total: f64 = colors.iter().map(|c| c.proportion).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(colors.iter().all(|c| c.rgb == [5, 6, 7]));
    }

    #[test]
    fn test_fewer_pixels_than_clusters() {
        let image = RgbImage::from_pixel(1, 1, Px([9, 9, 9]));
        let colors = dominant_colors(&image, &DominantConfig::default());
        assert_eq!(colors, vec![DominantColor::new([9, 9, 9], 1.0)]);
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let config = DominantConfig {
            max_pixels: 100,
            ..Default::default()
        };
        let pixels = sample_pixels(&two_tone(), config.max_pixels);
        assert!(pixels.len() <= 100);
        assert!(!pixels.is_empty());
    }
}
