//! Complex-number helpers for angular partitioning.
//!
//! Image coordinates are mapped into the complex plane as `x - i·y`, so the
//! imaginary axis points up the screen and angles grow counter-clockwise as
//! displayed. Orientations rotate this plane by `exp(±i·θ)`.

use super::Polygon;
use ndarray::{Array1, ArrayView2};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Exact multiplication by `-i`, a clockwise quarter turn.
pub const CLOCKWISE_QUARTER_TURN: Complex64 = Complex64::new(0.0, -1.0);

/// Screen position `(y, x)` as the complex number `x - i·y`.
#[inline]
pub fn screen_point(y: f64, x: f64) -> Complex64 {
    Complex64::new(x, -y)
}

/// Unit rotation `exp(i·theta)`.
#[inline]
pub fn rotation(theta: f64) -> Complex64 {
    Complex64::from_polar(1.0, theta)
}

/// Argument in `(-π, π]`.
///
/// Signed zeros are folded to `+0.0` first, so the origin maps to `0` and every
/// point on the negative real axis maps to `+π` regardless of how it was computed.
#[inline]
pub fn principal_arg(z: Complex64) -> f64 {
    (z.im + 0.0).atan2(z.re + 0.0)
}

/// `n_points` evenly spaced values over the closed interval `[start, end]`.
///
/// The final value is pinned to `end` so a bin boundary derived from an observed
/// maximum compares equal to it.
pub fn linspace(start: f64, end: f64, n_points: usize) -> Vec<f64> {
    let mut values = Array1::linspace(start, end, n_points).to_vec();
    if let Some(last) = values.last_mut() {
        *last = end;
    }
    values
}

/// Canonical phase sequence: `n` values over `[0, 2π)` without the endpoint,
/// reversed when `mirrored` is set.
pub fn phase_sequence(n: usize, mirrored: bool) -> Vec<f64> {
    let step = 2.0 * PI / n.max(1) as f64;
    let mut phases: Vec<f64> = (0..n).map(|i| i as f64 * step).collect();
    if mirrored {
        phases.reverse();
    }
    phases
}

/// Index of the bin `[edges[i], edges[i + 1])` containing `angle`.
///
/// When `close_last` is set the final bin also takes `angle == edges[last]`.
/// Values outside the edges (and NaN) fall in no bin.
pub fn bin_index(angle: f64, edges: &[f64], close_last: bool) -> Option<usize> {
    let n_bins = edges.len().checked_sub(1)?;
    if n_bins == 0 || angle.is_nan() {
        return None;
    }
    let above = edges.partition_point(|&edge| edge <= angle);
    if above == 0 {
        return None;
    }
    if above > n_bins {
        return (close_last && angle == edges[n_bins]).then_some(n_bins - 1);
    }
    Some(above - 1)
}

/// Orientation encoded by a two-point line annotation.
///
/// Rows are vertices whose last two columns are `(y, x)`. The line runs from the
/// first to the second vertex and the result is the angle of the start-to-end
/// vector rotated by a quarter turn, `arg(i·(dx - i·dy))`. Returns `None` for
/// annotations with fewer than two vertices or two coordinates.
pub fn orientation_from_line(line: ArrayView2<'_, f64>) -> Option<f64> {
    let (n_vertices, n_coords) = line.dim();
    if n_vertices < 2 || n_coords < 2 {
        return None;
    }
    let (y_col, x_col) = (n_coords - 2, n_coords - 1);
    let dx = line[[1, x_col]] - line[[0, x_col]];
    let dy = line[[1, y_col]] - line[[0, y_col]];
    let start_to_end = Complex64::new(dx, -dy);
    Some((Complex64::i() * start_to_end).arg())
}

/// Orientation from a list of reference lines; only the first is used.
///
/// No reference (or an unusable first line) yields `0.0`.
pub fn orientation_from_reference(reference: &[Polygon]) -> f64 {
    reference
        .first()
        .and_then(|line| orientation_from_line(line.view()))
        .unwrap_or(0.0)
}
