//! Fan-shaped body: triangular columns radiating from a hub point.
//!
//! The hub is not the centroid. In the frame rotated by the orientation, it takes its
//! lateral coordinate from the centroid and its dorsoventral coordinate from the mask
//! pixel furthest along the orientation axis, which usually places it outside the mask
//! at the stem of the fan.

use super::{SubRegion, SubRegionKind, ViewDirection};
use crate::error::{RoiError, RoiResult};
use crate::geometry::angular::{
    bin_index, linspace, phase_sequence, principal_arg, rotation, screen_point,
};
use crate::geometry::{plane_centroid, Mask};
use ndarray::{ArrayView2, Axis};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Column count when none is requested.
pub const DEFAULT_SEGMENTS: usize = 8;

/// Parameters of a fan-shaped region.
#[derive(Debug, Clone, PartialEq)]
pub struct FanParams {
    /// Rotation, in radians, that points the posterior fan down the image
    pub orientation: f64,
    /// Side the structure was imaged from
    pub view_direction: ViewDirection,
    /// Reverses column phases
    pub mirrored: bool,
}

impl Default for FanParams {
    fn default() -> Self {
        Self {
            orientation: 0.0,
            view_direction: ViewDirection::Anterior,
            mirrored: true,
        }
    }
}

/// How a fan is divided into columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FanSegmentationMethod {
    /// Equal angular wedges from the hub point
    #[default]
    Triangles,
    /// Equal path-length chunks along a midline
    Midline,
}

impl fmt::Display for FanSegmentationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanSegmentationMethod::Triangles => f.write_str("triangles"),
            FanSegmentationMethod::Midline => f.write_str("midline"),
        }
    }
}

impl FromStr for FanSegmentationMethod {
    type Err = RoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "triangles" => Ok(FanSegmentationMethod::Triangles),
            "midline" => Ok(FanSegmentationMethod::Midline),
            other => Err(RoiError::InvalidParameter(format!(
                "{} is not a valid fan segmentation method",
                other
            ))),
        }
    }
}

/// Divide `mask` into `n_segments` columns.
///
/// # Errors
///
/// [`RoiError::Unsupported`] for [`FanSegmentationMethod::Midline`].
pub fn segment(
    mask: &Mask,
    params: &FanParams,
    n_segments: usize,
    method: FanSegmentationMethod,
    view_direction: ViewDirection,
) -> RoiResult<Vec<SubRegion>> {
    if n_segments == 0 {
        return Err(RoiError::InvalidParameter(
            "a fan needs at least one column".to_string(),
        ));
    }
    if method == FanSegmentationMethod::Midline {
        return Err(RoiError::Unsupported(
            "midline segmentation of fan-shaped regions".to_string(),
        ));
    }

    let mut columns = vec![Mask::from_elem(mask.dim(), false); n_segments];
    for (plane_idx, plane) in mask.axis_iter(Axis(0)).enumerate() {
        for (y, x, column) in triangle_columns(plane, params.orientation, n_segments, view_direction)
        {
            columns[column][[plane_idx, y, x]] = true;
        }
    }

    debug!(n_segments, ?view_direction, "split fan into columns");

    Ok(columns
        .into_iter()
        .zip(phase_sequence(n_segments, params.mirrored))
        .map(|(column, phase)| {
            let mut sub = SubRegion::from_mask(column, SubRegionKind::Column, Some(phase));
            sub.view_direction = Some(view_direction);
            sub
        })
        .collect())
}

/// Hub point of one plane, in screen coordinates `x - i·y`.
///
/// `None` for an empty plane.
pub fn hub_point(plane: ArrayView2<'_, bool>, orientation: f64) -> Option<Complex64> {
    let (cy, cx) = plane_centroid(plane)?;
    let centroid = screen_point(cy, cx);
    let unrotate = rotation(-orientation);

    // furthest along the orientation axis, first pixel wins on ties
    let mut most_downward: Option<(f64, Complex64)> = None;
    for ((y, x), &inside) in plane.indexed_iter() {
        if !inside {
            continue;
        }
        let pixel = screen_point(y as f64, x as f64);
        let depth = ((centroid - pixel) * unrotate).im;
        if most_downward.map_or(true, |(best, _)| depth > best) {
            most_downward = Some((depth, pixel));
        }
    }
    let (_, down) = most_downward?;

    let lateral = (centroid * unrotate).re;
    let along = (down * unrotate).im;
    Some(Complex64::new(lateral, along) * rotation(orientation))
}

/// `(y, x, column)` for every in-mask pixel of one plane.
fn triangle_columns(
    plane: ArrayView2<'_, bool>,
    orientation: f64,
    n_segments: usize,
    view_direction: ViewDirection,
) -> Vec<(usize, usize, usize)> {
    let Some(hub) = hub_point(plane, orientation) else {
        return Vec::new();
    };
    let turn = rotation(orientation);
    let sign = if view_direction == ViewDirection::Posterior {
        1.0
    } else {
        -1.0
    };

    let angles: Vec<(usize, usize, f64)> = plane
        .indexed_iter()
        .filter(|(_, &inside)| inside)
        .map(|((y, x), _)| {
            let ray = (screen_point(y as f64, x as f64) - hub) * turn;
            (y, x, sign * principal_arg(ray))
        })
        .collect();

    let (lo, hi) = angles
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, _, a)| {
            (lo.min(a), hi.max(a))
        });
    // a fan does not wrap, so the bins span only the observed range
    let edges = linspace(lo, hi, n_segments + 1);

    angles
        .into_iter()
        .filter_map(|(y, x, angle)| bin_index(angle, &edges, true).map(|bin| (y, x, bin)))
        .collect()
}
