//! Histogram of oriented gradients.
//!
//! Centered-difference gradients, unsigned orientations in `[0, 180)`,
//! magnitude-weighted cell histograms averaged over the cell area, and
//! overlapping blocks (one-cell stride) normalised with L2-Hys.

use crate::config::HogConfig;
use crate::plane::Plane;

const L2HYS_CLIP: f64 = 0.2;
const L2HYS_EPSILON: f64 = 1e-5;

/// Returns an empty vector when the image is smaller than one block
pub fn hog(gray: &Plane, config: &HogConfig) -> Vec<f64> {
    let (w, h) = (gray.width, gray.height);
    let cell = config.cell_size;
    let bins = config.orientations;
    let cells_x = w / cell;
    let cells_y = h / cell;
    if cells_x < config.block_size || cells_y < config.block_size {
        return Vec::new();
    }

    let cell_hist = cell_histograms(gray, config, cells_x, cells_y);

    let block = config.block_size;
    let blocks_x = cells_x - block + 1;
    let blocks_y = cells_y - block + 1;
    let mut out = Vec::with_capacity(config.vector_len(w, h));
    let mut buf = Vec::with_capacity(block * block * bins);

    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            buf.clear();
            for cy in by..by + block {
                for cx in bx..bx + block {
                    let start = (cy * cells_x + cx) * bins;
                    buf.extend_from_slice(&cell_hist[start..start + bins]);
                }
            }
            l2_hys(&mut buf);
            out.extend_from_slice(&buf);
        }
    }
    out
}

fn cell_histograms(gray: &Plane, config: &HogConfig, cells_x: usize, cells_y: usize) -> Vec<f64> {
    let (w, h) = (gray.width, gray.height);
    let cell = config.cell_size;
    let bins = config.orientations;
    let bin_width = 180.0 / bins as f64;
    let area = (cell * cell) as f64;
    let mut hist = vec![0.0; cells_x * cells_y * bins];

    // Pixels in a partial trailing cell are ignored
    for y in 0..cells_y * cell {
        for x in 0..cells_x * cell {
            let gx = if x == 0 || x == w - 1 { 0.0 } else { gray.at(x + 1, y) - gray.at(x - 1, y) };
            let gy = if y == 0 || y == h - 1 { 0.0 } else { gray.at(x, y + 1) - gray.at(x, y - 1) };
            let magnitude = gx.hypot(gy);
            if magnitude == 0.0 {
                continue;
            }
            let angle = gy.atan2(gx).to_degrees().rem_euclid(180.0);
            let bin = ((angle / bin_width) as usize).min(bins - 1);
            let c = (y / cell) * cells_x + x / cell;
            hist[c * bins + bin] += magnitude / area;
        }
    }
    hist
}

fn l2_hys(block: &mut [f64]) {
    let eps2 = L2HYS_EPSILON * L2HYS_EPSILON;
    let norm = (block.iter().map(|v| v * v).sum::<f64>() + eps2).sqrt();
    for v in block.iter_mut() {
        *v = (*v / norm).min(L2HYS_CLIP);
    }
    let norm = (block.iter().map(|v| v * v).sum::<f64>() + eps2).sqrt();
    for v in block.iter_mut() {
        *v /= norm;
    }
}
