//! Noduli protocols.
//!
//! The noduli are a pair of blobs, one per hemisphere. "Draw ROI" takes the two
//! largest drawn shapes as the hemispheres directly.

use super::{Capabilities, ExtractionInput, ExtractionOptions, ExtractionProtocol, ShapeKind};
use crate::error::{RoiError, RoiResult};
use crate::geometry::angular::orientation_from_reference;
use crate::geometry::{n_largest_shapes_in_list, subtract_into, union_into, Mask, Polygon, Shape};
use crate::roi::{blobs, BlobsParams, Region, RoiCore, SubRegion, SubRegionKind, ViewDirection};
use ndarray::{concatenate, ArrayView2, Axis};
use tracing::{debug, warn};

/// Split a single blob mask into hemispheres. Not implemented.
pub fn detect_hemispheres(_mask: &Mask) -> RoiResult<Vec<Mask>> {
    Err(RoiError::Unsupported(
        "automatic hemisphere detection".to_string(),
    ))
}

/// Hemispheres from the two largest drawn shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawRoi;

impl DrawRoi {
    fn mask_hemispheres(
        masks: Vec<Mask>,
        exclusion: Option<&Mask>,
    ) -> RoiResult<(RoiCore, Vec<SubRegion>)> {
        let mut hemispheres = Vec::with_capacity(masks.len());
        let mut union: Option<Mask> = None;
        for mut mask in masks {
            if let Some(exclusion) = exclusion {
                subtract_into(&mut mask, exclusion)?;
            }
            match union.as_mut() {
                Some(acc) => union_into(acc, &mask)?,
                None => union = Some(mask.clone()),
            }
            hemispheres.push(SubRegion::from_mask(mask, SubRegionKind::Hemisphere, None));
        }
        let union = union.ok_or_else(|| RoiError::NoRoi("no hemispheres drawn".to_string()))?;
        Ok((RoiCore::from_mask(union), hemispheres))
    }

    fn polygon_hemispheres(
        polygons: Vec<Polygon>,
        image_shape: Option<[usize; 3]>,
    ) -> RoiResult<(RoiCore, Vec<SubRegion>)> {
        let shape = image_shape.map(|s| s.to_vec());
        let views: Vec<ArrayView2<'_, f64>> = polygons.iter().map(|p| p.view()).collect();
        let outline = concatenate(Axis(0), &views)?;
        let core = RoiCore::new(None, Some(outline), shape.clone())?;
        let hemispheres = polygons
            .into_iter()
            .map(|polygon| {
                Ok(SubRegion {
                    core: RoiCore::new(None, Some(polygon), shape.clone())?,
                    kind: SubRegionKind::Hemisphere,
                    phase: None,
                    view_direction: None,
                })
            })
            .collect::<RoiResult<_>>()?;
        Ok((core, hemispheres))
    }
}

impl ExtractionProtocol for DrawRoi {
    fn name(&self) -> &'static str {
        "Draw ROI"
    }

    fn base_roi_text(&self) -> &'static str {
        "Draw ROIs manually"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accepts_reference_frames: true,
            accepts_anatomy_reference: true,
            shape_kind: Some(ShapeKind::Polygon),
            allows_exclusion: true,
            anatomy_reference_kind: ShapeKind::Line,
            ..Capabilities::default()
        }
    }

    fn region_class(&self) -> &'static str {
        "Blobs"
    }

    /// The region mask is the union of both hemispheres after exclusion.
    fn extract(
        &self,
        input: &ExtractionInput<'_>,
        options: &ExtractionOptions,
    ) -> RoiResult<Region> {
        let image_shape = input.image_shape();
        let shapes = n_largest_shapes_in_list(input.shapes, 2, options.slice_idx, image_shape)?;

        let (core, hemispheres) = if shapes.iter().all(Shape::is_mask) {
            let masks = shapes.into_iter().filter_map(Shape::into_mask).collect();
            Self::mask_hemispheres(masks, options.exclusion.as_ref())?
        } else {
            if options.exclusion.is_some() {
                warn!("exclusion mask ignored for polygon hemispheres");
            }
            let polygons = shapes.into_iter().filter_map(Shape::into_polygon).collect();
            Self::polygon_hemispheres(polygons, image_shape)?
        };

        let params = BlobsParams {
            orientation: orientation_from_reference(input.anatomy_reference),
            view_direction: options.view_direction.unwrap_or(ViewDirection::Posterior),
        };
        let core = core
            .with_name(options.roi_name.as_deref().unwrap_or("Noduli"))
            .with_slice_idx(options.slice());

        debug!(protocol = self.name(), hemispheres = hemispheres.len(), "extracted noduli");
        blobs::build(core, hemispheres, params)
    }
}

/// Independent component analysis of the frame data. Not implemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ica;

impl ExtractionProtocol for Ica {
    fn name(&self) -> &'static str {
        "ICA (independent component analysis)"
    }

    fn base_roi_text(&self) -> &'static str {
        "Extract noduli with ICA"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accepts_frame_data: true,
            accepts_reference_frames: true,
            accepts_anatomy_reference: true,
            anatomy_reference_kind: ShapeKind::Line,
            ..Capabilities::default()
        }
    }

    fn region_class(&self) -> &'static str {
        "Blobs"
    }

    fn extract(&self, _input: &ExtractionInput<'_>, _options: &ExtractionOptions) -> RoiResult<Region> {
        Err(RoiError::Unsupported("ICA extraction of noduli".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::pixel_count;
    use crate::roi::RegionKind;
    use ndarray::{array, s};

    fn blob(x0: usize, width: usize) -> Mask {
        let mut mask = Mask::from_elem((1, 6, 20), false);
        mask.slice_mut(s![0, 1..5, x0..x0 + width]).fill(true);
        mask
    }

    #[test]
    fn test_two_largest_become_ordered_hemispheres() {
        let shapes = vec![
            Shape::Mask(blob(12, 4)),
            Shape::Mask(blob(8, 1)),
            Shape::Mask(blob(1, 3)),
        ];
        let region = DrawRoi
            .extract(&ExtractionInput::from_shapes(&shapes), &ExtractionOptions::default())
            .unwrap();

        assert!(matches!(region.kind, RegionKind::Blobs(_)));
        assert_eq!(region.name(), "Noduli");
        assert_eq!(pixel_count(region.mask().unwrap().view()), 16 + 12);
        let hemispheres = region.subregions();
        assert_eq!(hemispheres.len(), 2);
        // posterior view: image left first
        assert_eq!(pixel_count(hemispheres[0].mask().unwrap().view()), 12);
        assert_eq!(hemispheres[0].phase, Some(0.0));
        assert_eq!(hemispheres[1].phase, Some(1.0));
    }

    #[test]
    fn test_exclusion_applies_to_each_hemisphere() {
        let shapes = vec![Shape::Mask(blob(1, 3)), Shape::Mask(blob(12, 4))];
        let mut exclusion = Mask::from_elem((1, 6, 20), false);
        exclusion.slice_mut(s![0, 1, ..]).fill(true);
        let options = ExtractionOptions {
            exclusion: Some(exclusion),
            ..ExtractionOptions::default()
        };
        let region = DrawRoi
            .extract(&ExtractionInput::from_shapes(&shapes), &options)
            .unwrap();
        assert_eq!(pixel_count(region.mask().unwrap().view()), 9 + 12);
    }

    #[test]
    fn test_polygon_hemispheres_on_a_slice() {
        let shapes = vec![
            Shape::Polygon(array![[0.0, 1.0, 1.0], [0.0, 1.0, 3.0], [0.0, 3.0, 2.0]]),
            Shape::Polygon(array![[0.0, 1.0, 12.0], [0.0, 1.0, 16.0], [0.0, 5.0, 14.0]]),
        ];
        let frames = ndarray::Array3::<f64>::zeros((1, 6, 20));
        let input = ExtractionInput::from_shapes(&shapes).with_reference_frames(frames.view());
        let options = ExtractionOptions {
            slice_idx: Some(0),
            ..ExtractionOptions::default()
        };
        let region = DrawRoi.extract(&input, &options).unwrap();
        assert_eq!(region.core.raw_polygon().unwrap().nrows(), 6);
        assert_eq!(region.subregions()[0].center_estimate().unwrap()[2], 2.0);
    }

    #[test]
    fn test_placeholders_are_unsupported() {
        assert!(matches!(
            Ica.extract(&ExtractionInput::default(), &ExtractionOptions::default()),
            Err(RoiError::Unsupported(_))
        ));
        assert!(matches!(
            detect_hemispheres(&blob(0, 2)),
            Err(RoiError::Unsupported(_))
        ));
    }
}
