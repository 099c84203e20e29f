//! Ellipsoid body: angular wedges around a centre.
//!
//! The vector from each pixel to the centre is mapped to `x - i·y` and turned by `-i`,
//! so angle 0 faces down the image, then by `exp(-i·orientation)`. Viewing from the
//! posterior side conjugates the field, reversing the traversal. The range `[-π, π)`
//! is cut into equal half-open bins, one wedge per bin.
//!
//! Angles are taken in `(-π, π]`, so pixels whose rotated angle is exactly `+π` lie
//! outside every bin and are not assigned to any wedge. With zero orientation these
//! are the pixels straight above an integer-valued centre.

use super::{SubRegion, SubRegionKind, ViewDirection};
use crate::error::{RoiError, RoiResult};
use crate::geometry::angular::{
    bin_index, linspace, phase_sequence, principal_arg, rotation, screen_point,
    CLOCKWISE_QUARTER_TURN,
};
use crate::geometry::{plane_centroid, Mask};
use ndarray::Axis;
use std::f64::consts::PI;
use tracing::debug;

/// Wedge count when none is requested.
pub const DEFAULT_SEGMENTS: usize = 16;

/// Parameters of an ellipse-shaped region.
#[derive(Debug, Clone, PartialEq)]
pub struct EllipseParams {
    /// Rotation, in radians, that brings the ventral side to the bottom of the image
    pub orientation: f64,
    /// Inner exclusion zone; its per-plane centroid is the segmentation centre
    pub center_mask: Option<Mask>,
    /// Side the structure was imaged from
    pub view_direction: ViewDirection,
    /// Image is a left-right flip of the anatomy; reverses wedge phases
    pub mirrored: bool,
}

impl Default for EllipseParams {
    fn default() -> Self {
        Self {
            orientation: 0.0,
            center_mask: None,
            view_direction: ViewDirection::Anterior,
            mirrored: false,
        }
    }
}

/// Cut `mask` into `n_segments` wedges, plane by plane.
///
/// Wedge `i` of every plane is stacked into the `i`-th returned subregion, whose
/// phase is the `i`-th entry of the canonical phase sequence. Empty planes give
/// empty wedges.
pub fn segment(
    mask: &Mask,
    params: &EllipseParams,
    n_segments: usize,
    view_direction: ViewDirection,
) -> RoiResult<Vec<SubRegion>> {
    if n_segments == 0 {
        return Err(RoiError::InvalidParameter(
            "an ellipse needs at least one wedge".to_string(),
        ));
    }
    let center_mask = params.center_mask.as_ref();
    if let Some(center) = center_mask {
        if center.dim() != mask.dim() {
            return Err(RoiError::ShapeMismatch {
                expected: mask.shape().to_vec(),
                found: center.shape().to_vec(),
            });
        }
    }

    let edges = linspace(-PI, PI, n_segments + 1);
    let turn = CLOCKWISE_QUARTER_TURN * rotation(-params.orientation);
    let reverse = view_direction == ViewDirection::Posterior;

    let mut wedges = vec![Mask::from_elem(mask.dim(), false); n_segments];

    for (plane_idx, plane) in mask.axis_iter(Axis(0)).enumerate() {
        let center = center_mask
            .and_then(|center| plane_centroid(center.index_axis(Axis(0), plane_idx)))
            .or_else(|| plane_centroid(plane));
        let Some((cy, cx)) = center else {
            continue;
        };

        for ((y, x), &inside) in plane.indexed_iter() {
            if !inside {
                continue;
            }
            let mut z = screen_point(cy - y as f64, cx - x as f64) * turn;
            if reverse {
                z = z.conj();
            }
            if let Some(bin) = bin_index(principal_arg(z), &edges, false) {
                wedges[bin][[plane_idx, y, x]] = true;
            }
        }
    }

    debug!(n_segments, ?view_direction, "split ellipse into wedges");

    Ok(wedges
        .into_iter()
        .zip(phase_sequence(n_segments, params.mirrored))
        .map(|(wedge, phase)| {
            let mut sub = SubRegion::from_mask(wedge, SubRegionKind::Wedge, Some(phase));
            sub.view_direction = Some(view_direction);
            sub
        })
        .collect())
}
