//! Fan-shaped body protocol.

use super::{core_from_shape, Capabilities, ExtractionInput, ExtractionOptions, ExtractionProtocol, ShapeKind};
use crate::error::RoiResult;
use crate::geometry::angular::orientation_from_reference;
use crate::geometry::{nth_largest_shape_in_list, subtract_into, Shape};
use crate::roi::{FanParams, Region, RegionKind, ViewDirection};
use tracing::{debug, warn};

/// Uses the largest drawn outline as the fan, minus an optional exclusion mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineFan;

impl ExtractionProtocol for OutlineFan {
    fn name(&self) -> &'static str {
        "Outline fan"
    }

    fn base_roi_text(&self) -> &'static str {
        "Extract fan"
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
        "Fan"
    }

    fn extract(
        &self,
        input: &ExtractionInput<'_>,
        options: &ExtractionOptions,
    ) -> RoiResult<Region> {
        let image_shape = input.image_shape();
        let main = match (
            nth_largest_shape_in_list(input.shapes, 1, options.slice_idx, image_shape)?,
            options.exclusion.as_ref(),
        ) {
            (Shape::Mask(mut fan), Some(exclusion)) => {
                subtract_into(&mut fan, exclusion)?;
                Shape::Mask(fan)
            }
            (polygon @ Shape::Polygon(_), Some(_)) => {
                warn!("exclusion mask ignored for a polygon outline");
                polygon
            }
            (shape, None) => shape,
        };

        let params = FanParams {
            orientation: orientation_from_reference(input.anatomy_reference),
            view_direction: options.view_direction.unwrap_or(ViewDirection::Anterior),
            mirrored: options.mirrored.unwrap_or(true),
        };
        let core = core_from_shape(main, image_shape)?
            .with_name(options.roi_name.as_deref().unwrap_or("Fan"))
            .with_slice_idx(options.slice());

        debug!(
            protocol = self.name(),
            orientation = params.orientation,
            excluded = options.exclusion.is_some(),
            "extracted fan"
        );
        Ok(Region::new(core, RegionKind::Fan(params)))
    }
}
