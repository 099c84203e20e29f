//! Ellipsoid body protocols.

use super::{core_from_shape, Capabilities, ExtractionInput, ExtractionOptions, ExtractionProtocol, ShapeKind};
use crate::error::{RoiError, RoiResult};
use crate::geometry::angular::orientation_from_reference;
use crate::geometry::{intersect_into, nth_largest_shape_in_list, subtract_into, Shape};
use crate::roi::{EllipseParams, Region, RegionKind, ViewDirection};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, warn};

/// What shapes beyond the largest are used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraRois {
    /// Ignored
    None,
    /// The second largest marks the centre of the ellipse and is cut out of it
    Center,
}

impl FromStr for ExtraRois {
    type Err = RoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ExtraRois::None),
            "center" => Ok(ExtraRois::Center),
            other => Err(RoiError::InvalidParameter(format!(
                "unknown extra ROI role '{}'",
                other
            ))),
        }
    }
}

/// Uses the largest drawn ellipse as the region outline.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseEllipse;

impl ExtractionProtocol for UseEllipse {
    fn name(&self) -> &'static str {
        "Use ellipse"
    }

    fn base_roi_text(&self) -> &'static str {
        "Extract ellipse"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accepts_reference_frames: true,
            accepts_anatomy_reference: true,
            shape_kind: Some(ShapeKind::Ellipse),
            ..Capabilities::default()
        }
    }

    fn region_class(&self) -> &'static str {
        "Ellipse"
    }

    /// The largest shape is the ellipse. With [`ExtraRois::Center`] the second
    /// largest, clipped to the ellipse, becomes the centre mask and is subtracted.
    fn extract(
        &self,
        input: &ExtractionInput<'_>,
        options: &ExtractionOptions,
    ) -> RoiResult<Region> {
        let image_shape = input.image_shape();
        if options.extra_rois == ExtraRois::Center && input.shapes.len() < 2 {
            return Err(RoiError::InvalidSelection(
                "Did not provide a second ROI for the extra ROI field".to_string(),
            ));
        }

        let main = nth_largest_shape_in_list(input.shapes, 1, options.slice_idx, image_shape)?;
        let mut center_mask = None;
        let main = match (options.extra_rois, main) {
            (ExtraRois::Center, Shape::Mask(mut ellipse)) => {
                let mut center = match nth_largest_shape_in_list(
                    input.shapes,
                    2,
                    options.slice_idx,
                    image_shape,
                )? {
                    Shape::Mask(center) => center,
                    Shape::Polygon(_) => {
                        return Err(RoiError::TypeMismatch(
                            "centre shape is not a mask".to_string(),
                        ))
                    }
                };
                intersect_into(&mut center, &ellipse)?;
                subtract_into(&mut ellipse, &center)?;
                center_mask = Some(center);
                Shape::Mask(ellipse)
            }
            (ExtraRois::Center, polygon) => {
                warn!("centre exclusion needs masks, keeping the polygon outline unchanged");
                polygon
            }
            (ExtraRois::None, shape) => shape,
        };

        let params = EllipseParams {
            orientation: orientation_from_reference(input.anatomy_reference),
            center_mask,
            view_direction: options.view_direction.unwrap_or(ViewDirection::Anterior),
            mirrored: options.mirrored.unwrap_or(false),
        };
        let core = core_from_shape(main, image_shape)?
            .with_name(options.roi_name.as_deref().unwrap_or("Ellipse"))
            .with_slice_idx(options.slice());

        debug!(
            protocol = self.name(),
            orientation = params.orientation,
            has_center = params.center_mask.is_some(),
            "extracted ellipse"
        );
        Ok(Region::new(core, RegionKind::Ellipse(params)))
    }
}

/// Correlation-map fitting for the ellipsoid body. Not implemented.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitVonMisesEllipse;

impl ExtractionProtocol for FitVonMisesEllipse {
    fn name(&self) -> &'static str {
        "Fit von Mises"
    }

    fn base_roi_text(&self) -> &'static str {
        "View correlation map"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accepts_reference_frames: true,
            ..Capabilities::default()
        }
    }

    fn region_class(&self) -> &'static str {
        "Ellipse"
    }

    fn extract(&self, _input: &ExtractionInput<'_>, _options: &ExtractionOptions) -> RoiResult<Region> {
        Err(RoiError::Unsupported(
            "von Mises fitting for the ellipsoid body".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{pixel_count, Mask, Polygon};
    use ndarray::{array, s};
    use std::f64::consts::PI;

    fn ring_and_hole() -> Vec<Shape> {
        let mut outer = Mask::from_elem((1, 10, 10), false);
        outer.slice_mut(s![0, 1..9, 1..9]).fill(true);
        let mut hole = Mask::from_elem((1, 10, 10), false);
        hole.slice_mut(s![0, 3..7, 3..7]).fill(true);
        vec![Shape::Mask(hole), Shape::Mask(outer)]
    }

    #[test]
    fn test_center_is_cut_out() {
        let shapes = ring_and_hole();
        let region = UseEllipse
            .extract(&ExtractionInput::from_shapes(&shapes), &ExtractionOptions::default())
            .unwrap();
        assert_eq!(pixel_count(region.mask().unwrap().view()), 64 - 16);
        let RegionKind::Ellipse(params) = &region.kind else {
            panic!("expected an ellipse");
        };
        assert_eq!(pixel_count(params.center_mask.as_ref().unwrap().view()), 16);
        assert_eq!(region.name(), "Ellipse");
    }

    #[test]
    fn test_center_needs_two_shapes() {
        let shapes = ring_and_hole()[1..].to_vec();
        let result = UseEllipse.extract(
            &ExtractionInput::from_shapes(&shapes),
            &ExtractionOptions::default(),
        );
        assert!(matches!(result, Err(RoiError::InvalidSelection(_))));

        let options = ExtractionOptions {
            extra_rois: ExtraRois::None,
            ..ExtractionOptions::default()
        };
        let region = UseEllipse
            .extract(&ExtractionInput::from_shapes(&shapes), &options)
            .unwrap();
        assert_eq!(pixel_count(region.mask().unwrap().view()), 64);
    }

    #[test]
    fn test_orientation_from_first_reference_line() {
        let shapes = ring_and_hole();
        let reference: Vec<Polygon> = vec![array![[5.0, 0.0], [5.0, 9.0]]];
        let input = ExtractionInput::from_shapes(&shapes).with_anatomy_reference(&reference);
        let region = UseEllipse.extract(&input, &ExtractionOptions::default()).unwrap();
        let orientation = region.kind.orientation().unwrap();
        assert!((orientation - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_von_mises_is_unsupported() {
        let result =
            FitVonMisesEllipse.extract(&ExtractionInput::default(), &ExtractionOptions::default());
        assert!(matches!(result, Err(RoiError::Unsupported(_))));
    }
}
