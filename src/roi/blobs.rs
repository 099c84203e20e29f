//! Paired blobs such as the noduli.
//!
//! Blobs have no midline and no angular structure. Their hemispheres are ordered
//! left-first, where "left" is anatomical: viewed from the posterior side the
//! anatomical left is on the image left, viewed from the anterior side it is on
//! the image right.

use super::{Region, RegionKind, RoiCore, SubRegion, SubRegionKind, ViewDirection};
use crate::error::{RoiError, RoiResult};
use crate::geometry::angular::{rotation, screen_point};
use tracing::debug;

/// Parameters of a blob-pair region.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobsParams {
    /// Rotation, in radians, taken from the anatomy reference
    pub orientation: f64,
    /// Side the structure was imaged from
    pub view_direction: ViewDirection,
}

impl Default for BlobsParams {
    fn default() -> Self {
        Self {
            orientation: 0.0,
            view_direction: ViewDirection::Posterior,
        }
    }
}

/// Blob region owning `hemispheres`, ordered left-first.
pub fn build(core: RoiCore, hemispheres: Vec<SubRegion>, params: BlobsParams) -> RoiResult<Region> {
    let ordered = reorder_hemispheres(hemispheres, params.orientation, params.view_direction)?;
    Ok(Region::new(core, RegionKind::Blobs(params)).with_subregions(ordered))
}

/// Sort hemispheres left-first and assign ordinal phases `0, 1, ...`.
///
/// Position is the hemisphere centre projected on the lateral axis of the frame
/// rotated by `orientation`. Hemispheres without a centre sort last.
///
/// # Errors
///
/// [`RoiError::Unsupported`] when there are no hemispheres: splitting a single blob
/// mask into hemispheres is not implemented.
pub fn reorder_hemispheres(
    mut hemispheres: Vec<SubRegion>,
    orientation: f64,
    view_direction: ViewDirection,
) -> RoiResult<Vec<SubRegion>> {
    if hemispheres.is_empty() {
        return Err(RoiError::Unsupported(
            "segmenting blobs from a single source mask".to_string(),
        ));
    }

    let unrotate = rotation(-orientation);
    let lateral = |sub: &SubRegion| -> f64 {
        sub.center_estimate()
            .map(|[_, y, x]| (screen_point(y, x) * unrotate).re)
            .unwrap_or(f64::NAN)
    };
    let anterior = view_direction == ViewDirection::Anterior;

    hemispheres.sort_by(|a, b| {
        let (la, lb) = (lateral(a), lateral(b));
        match (la.is_nan(), lb.is_nan()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) if anterior => lb.total_cmp(&la),
            (false, false) => la.total_cmp(&lb),
        }
    });

    debug!(count = hemispheres.len(), ?view_direction, "ordered hemispheres");

    Ok(hemispheres
        .into_iter()
        .enumerate()
        .map(|(i, mut sub)| {
            sub.kind = SubRegionKind::Hemisphere;
            sub.phase = Some(i as f64);
            sub.view_direction = Some(view_direction);
            sub
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mask;
    use std::f64::consts::PI;

    fn dot(x: usize) -> SubRegion {
        let mut mask = Mask::from_elem((1, 5, 10), false);
        mask[[0, 2, x]] = true;
        SubRegion::from_mask(mask, SubRegionKind::Generic, None)
    }

    fn xs(subs: &[SubRegion]) -> Vec<f64> {
        subs.iter()
            .map(|s| s.center_estimate().unwrap()[2])
            .collect()
    }

    #[test]
    fn test_posterior_is_image_left_first() {
        let ordered =
            reorder_hemispheres(vec![dot(8), dot(1)], 0.0, ViewDirection::Posterior).unwrap();
        assert_eq!(xs(&ordered), vec![1.0, 8.0]);
        assert_eq!(ordered[0].phase, Some(0.0));
        assert_eq!(ordered[1].phase, Some(1.0));
        assert!(ordered.iter().all(|s| s.kind == SubRegionKind::Hemisphere));
    }

    #[test]
    fn test_anterior_is_image_right_first() {
        let ordered =
            reorder_hemispheres(vec![dot(1), dot(8)], 0.0, ViewDirection::Anterior).unwrap();
        assert_eq!(xs(&ordered), vec![8.0, 1.0]);
    }

    #[test]
    fn test_orientation_rotates_the_lateral_axis() {
        // a half turn swaps image left and right
        let ordered =
            reorder_hemispheres(vec![dot(1), dot(8)], PI, ViewDirection::Posterior).unwrap();
        assert_eq!(xs(&ordered), vec![8.0, 1.0]);
    }

    #[test]
    fn test_single_mask_blobs_cannot_segment() {
        assert!(matches!(
            reorder_hemispheres(vec![], 0.0, ViewDirection::Posterior),
            Err(RoiError::Unsupported(_))
        ));
    }
}
