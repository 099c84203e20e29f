//! Ranking raw shapes by size.
//!
//! Size means pixel count for masks and shoelace area for polygons. When no slice is
//! fixed, masks are ranked independently in every plane and the whole masks of the
//! per-plane winners are OR-ed into one volume. This is not the same as the n-th
//! largest shape by total 3-D size, and downstream segmentation relies on the
//! per-plane behaviour.

use super::{
    all_masks, plane_pixel_count, polygon_area, restrict_to_plane, union_into, Mask, Polygon,
    Shape,
};
use crate::error::{RoiError, RoiResult};
use ndarray::Axis;
use tracing::debug;

/// Map the "all planes" sentinels (`None` or any negative index) to `None`.
pub fn normalize_slice_idx(slice_idx: Option<i64>) -> Option<usize> {
    match slice_idx {
        Some(idx) if idx >= 0 => usize::try_from(idx).ok(),
        _ => None,
    }
}

/// Stable ascending sort by size, then take the `n`-th from the top.
///
/// Ties resolve to the later candidate, matching a stable argsort read from the end.
fn pick_nth<T: Copy>(mut sized: Vec<(T, f64)>, n: usize) -> Option<T> {
    sized.sort_by(|a, b| a.1.total_cmp(&b.1));
    let len = sized.len();
    if n == 0 || n > len {
        return None;
    }
    Some(sized[len - n].0)
}

/// Select the shape with the `n`-th largest size (`n` starts at 1).
///
/// # Arguments
///
/// * `shapes` - Candidate shapes. Mask mode applies only when every shape is a mask.
/// * `n` - Rank to select, `1` is the largest.
/// * `slice_idx` - Plane to consider. `None` or a negative index means every plane.
/// * `image_shape` - Volume shape `(planes, height, width)`; checked against the masks
///   when given.
///
/// # Errors
///
/// * [`RoiError::InvalidSelection`] if `shapes` is empty, `n` is outside
///   `1..=shapes.len()`, or fewer than `n` shapes exist in the requested plane.
/// * [`RoiError::Unsupported`] for polygon input without a fixed slice.
/// * [`RoiError::ShapeMismatch`] if masks disagree on their shape.
pub fn nth_largest_shape_in_list(
    shapes: &[Shape],
    n: usize,
    slice_idx: Option<i64>,
    image_shape: Option<[usize; 3]>,
) -> RoiResult<Shape> {
    if shapes.is_empty() {
        return Err(RoiError::InvalidSelection(
            "No suitable shapes provided".to_string(),
        ));
    }
    if n < 1 || n > shapes.len() {
        return Err(RoiError::InvalidSelection(format!(
            "n must be between 1 and the number of shapes provided. Requested {}-largest of {} shapes",
            n,
            shapes.len()
        )));
    }

    let slice_idx = normalize_slice_idx(slice_idx);

    if all_masks(shapes) {
        let masks: Vec<&Mask> = shapes.iter().filter_map(Shape::as_mask).collect();
        let dim = masks[0].dim();
        for mask in &masks {
            if mask.dim() != dim {
                return Err(RoiError::ShapeMismatch {
                    expected: masks[0].shape().to_vec(),
                    found: mask.shape().to_vec(),
                });
            }
        }
        if let Some(expected) = image_shape {
            if expected != [dim.0, dim.1, dim.2] {
                return Err(RoiError::ShapeMismatch {
                    expected: expected.to_vec(),
                    found: masks[0].shape().to_vec(),
                });
            }
        }

        return match slice_idx {
            None => nth_largest_per_plane(&masks, n).map(Shape::Mask),
            Some(plane) => nth_largest_in_plane(&masks, n, plane).map(Shape::Mask),
        };
    }

    let Some(plane) = slice_idx else {
        return Err(RoiError::Unsupported(
            "polygon selection across all planes; only masks are supported without a fixed slice"
                .to_string(),
        ));
    };

    let polygons: Vec<&Polygon> = shapes
        .iter()
        .filter_map(Shape::as_polygon)
        .filter(|polygon| polygon_on_plane(polygon, plane))
        .collect();
    let sized = polygons
        .iter()
        .enumerate()
        .map(|(i, polygon)| (i, polygon_area(polygon.view())))
        .collect();

    pick_nth(sized, n)
        .map(|i| Shape::Polygon(polygons[i].clone()))
        .ok_or_else(|| {
            RoiError::InvalidSelection(format!(
                "Requested {}-largest polygon but only {} were drawn on plane {}",
                n,
                polygons.len(),
                plane
            ))
        })
}

/// The `n` largest shapes in descending order of size.
///
/// Every rank is selected independently, so this is quadratic in the number of
/// candidates. Shape lists are tens of entries at most.
pub fn n_largest_shapes_in_list(
    shapes: &[Shape],
    n: usize,
    slice_idx: Option<i64>,
    image_shape: Option<[usize; 3]>,
) -> RoiResult<Vec<Shape>> {
    (1..=n)
        .map(|rank| nth_largest_shape_in_list(shapes, rank, slice_idx, image_shape))
        .collect()
}

fn polygon_on_plane(polygon: &Polygon, plane: usize) -> bool {
    if polygon.ncols() < 3 {
        return true;
    }
    match polygon.nrows() {
        0 => false,
        _ => polygon[[0, 0]].round() == plane as f64,
    }
}

fn nth_largest_per_plane(masks: &[&Mask], n: usize) -> RoiResult<Mask> {
    let dim = masks[0].dim();
    let mut winners = vec![false; masks.len()];

    for plane in 0..dim.0 {
        let sized: Vec<(usize, f64)> = masks
            .iter()
            .enumerate()
            .map(|(i, mask)| (i, plane_pixel_count(mask.index_axis(Axis(0), plane)) as f64))
            .filter(|&(_, size)| size > 0.0)
            .collect();

        match pick_nth(sized, n) {
            Some(i) => winners[i] = true,
            None => debug!(plane, n, "fewer than n shapes in plane"),
        }
    }

    let mut out = Mask::from_elem(dim, false);
    for (mask, _) in masks.iter().zip(&winners).filter(|(_, won)| **won) {
        union_into(&mut out, mask)?;
    }
    Ok(out)
}

fn nth_largest_in_plane(masks: &[&Mask], n: usize, plane: usize) -> RoiResult<Mask> {
    let n_planes = masks[0].len_of(Axis(0));
    if plane >= n_planes {
        return Err(RoiError::InvalidSelection(format!(
            "slice_idx {} is outside a volume of {} planes",
            plane, n_planes
        )));
    }

    let sized: Vec<(usize, f64)> = masks
        .iter()
        .enumerate()
        .map(|(i, mask)| (i, plane_pixel_count(mask.index_axis(Axis(0), plane)) as f64))
        .filter(|&(_, size)| size > 0.0)
        .collect();
    let candidates = sized.len();

    pick_nth(sized, n)
        .map(|i| restrict_to_plane(masks[i], plane))
        .ok_or_else(|| {
            RoiError::InvalidSelection(format!(
                "Requested {}-largest mask but only {} have pixels in plane {}",
                n, candidates, plane
            ))
        })
}
