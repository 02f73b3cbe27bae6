//! Cross-correlation shift estimation
//!
//! Every image is registered against its predecessor (cascade strategy) by
//! maximizing the normalized cross-correlation over an integer search
//! window, coarse-to-fine over a 2x binning pyramid. The pairwise offsets
//! accumulate into shifts relative to the reference (first) image, which is
//! excluded from the output: an N-image series yields N-1 shifts.

use indicatif::{ParallelProgressIterator, ProgressBar};
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::{ops::Add, time::Instant};

use crate::series::ImageSeries;

#[derive(thiserror::Error, Debug)]
pub enum ShiftError {
    #[error("Image {index} is {width}x{height} but the reference is {reference_width}x{reference_height}")]
    DimensionMismatch {
        index: usize,
        width: usize,
        height: usize,
        reference_width: usize,
        reference_height: usize,
    },
}

/// Translation of an image relative to the reference image [px]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Shift {
    pub dx: f64,
    pub dy: f64,
}
impl Add for Shift {
    type Output = Shift;

    fn add(self, rhs: Self) -> Self::Output {
        Shift {
            dx: self.dx + rhs.dx,
            dy: self.dy + rhs.dy,
        }
    }
}

pub struct ShiftEstimator {
    search_radius: usize,
    coarse_size: usize,
}
impl Default for ShiftEstimator {
    fn default() -> Self {
        Self {
            search_radius: 64,
            coarse_size: 256,
        }
    }
}
impl ShiftEstimator {
    /// Largest translation searched for between consecutive images [px]
    pub fn search_radius(self, search_radius: usize) -> Self {
        Self {
            search_radius,
            ..self
        }
    }
    /// Images are binned 2x until no side exceeds this before the full search
    pub fn coarse_size(self, coarse_size: usize) -> Self {
        Self {
            coarse_size,
            ..self
        }
    }
    pub fn estimate(&self, series: &ImageSeries) -> Result<Vec<Shift>, ShiftError> {
        if series.len() < 2 {
            return Ok(Vec::new());
        }
        let reference = &series[0];
        for (index, image) in series.iter().enumerate().skip(1) {
            if image.width() != reference.width() || image.height() != reference.height() {
                return Err(ShiftError::DimensionMismatch {
                    index,
                    width: image.width(),
                    height: image.height(),
                    reference_width: reference.width(),
                    reference_height: reference.height(),
                });
            }
        }
        log::info!("Estimating shifts over {} image pairs...", series.len() - 1);
        let now = Instant::now();
        let pb = ProgressBar::new((series.len() - 1) as u64);
        let pairwise: Vec<Shift> = (1..series.len())
            .into_par_iter()
            .progress_with(pb)
            .map(|k| self.register(&series[k - 1].data, &series[k].data))
            .collect();
        log::info!("... estimated in {}ms", now.elapsed().as_millis());
        let mut cumulative = Shift::default();
        Ok(pairwise
            .into_iter()
            .map(|shift| {
                cumulative = cumulative + shift;
                cumulative
            })
            .collect())
    }
    /// Translation of `moving` relative to `fixed`
    fn register(&self, fixed: &DMatrix<f64>, moving: &DMatrix<f64>) -> Shift {
        let mut pyramid = vec![(center(fixed), center(moving))];
        loop {
            let (fixed, moving) = pyramid.last().unwrap();
            if largest_side(fixed) <= self.coarse_size {
                break;
            }
            let binned = (bin2(fixed), bin2(moving));
            pyramid.push(binned);
        }
        let coarsest = pyramid.len() - 1;
        let mut dy = 0i64;
        let mut dx = 0i64;
        for depth in (0..pyramid.len()).rev() {
            let (fixed, moving) = &pyramid[depth];
            let radius;
            if depth == coarsest {
                radius = ((self.search_radius >> depth) as i64).max(2);
            } else {
                // refine the doubled coarser estimate
                dy *= 2;
                dx *= 2;
                radius = 2;
            }
            let (best_dy, best_dx) = best_offset(fixed, moving, dy, dx, radius);
            dy = best_dy;
            dx = best_dx;
        }
        Shift {
            dx: dx as f64,
            dy: dy as f64,
        }
    }
}

fn largest_side(m: &DMatrix<f64>) -> usize {
    m.nrows().max(m.ncols())
}

fn center(m: &DMatrix<f64>) -> DMatrix<f64> {
    m.add_scalar(-m.mean())
}

fn bin2(m: &DMatrix<f64>) -> DMatrix<f64> {
    let nrows = m.nrows() / 2;
    let ncols = m.ncols() / 2;
    DMatrix::from_fn(nrows, ncols, |r, c| {
        (m[(2 * r, 2 * c)] + m[(2 * r + 1, 2 * c)] + m[(2 * r, 2 * c + 1)] + m[(2 * r + 1, 2 * c + 1)])
            * 0.25
    })
}

fn best_offset(
    fixed: &DMatrix<f64>,
    moving: &DMatrix<f64>,
    cy: i64,
    cx: i64,
    radius: i64,
) -> (i64, i64) {
    let mut best = (cy, cx);
    let mut best_score = f64::NEG_INFINITY;
    for oy in cy - radius..=cy + radius {
        for ox in cx - radius..=cx + radius {
            let score = ncc(fixed, moving, oy, ox);
            if score > best_score {
                best_score = score;
                best = (oy, ox);
            }
        }
    }
    best
}

/// Normalized cross-correlation of the overlap under the hypothesis
/// `moving[(y, x)] == fixed[(y - oy, x - ox)]`
fn ncc(fixed: &DMatrix<f64>, moving: &DMatrix<f64>, oy: i64, ox: i64) -> f64 {
    let nrows = fixed.nrows() as i64;
    let ncols = fixed.ncols() as i64;
    let y0 = oy.max(0);
    let y1 = nrows + oy.min(0);
    let x0 = ox.max(0);
    let x1 = ncols + ox.min(0);
    if y1 <= y0 || x1 <= x0 {
        return f64::NEG_INFINITY;
    }
    // a sliver of overlap correlates spuriously well once normalized
    if (y1 - y0) * (x1 - x0) * 4 < nrows * ncols {
        return f64::NEG_INFINITY;
    }
    let mut numerator = 0f64;
    let mut fixed_energy = 0f64;
    let mut moving_energy = 0f64;
    for y in y0..y1 {
        for x in x0..x1 {
            let f = fixed[((y - oy) as usize, (x - ox) as usize)];
            let m = moving[(y as usize, x as usize)];
            numerator += f * m;
            fixed_energy += f * f;
            moving_energy += m * m;
        }
    }
    if fixed_energy == 0f64 || moving_energy == 0f64 {
        return f64::NEG_INFINITY;
    }
    numerator / (fixed_energy * moving_energy).sqrt()
}
