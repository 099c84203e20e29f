//! Plain region from the largest drawn shape.

use super::{core_from_shape, Capabilities, ExtractionInput, ExtractionOptions, ExtractionProtocol, ShapeKind};
use crate::error::RoiResult;
use crate::geometry::nth_largest_shape_in_list;
use crate::roi::{Region, RegionKind};
use tracing::debug;

/// Keeps the largest shape as a generic region.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRoi;

impl ExtractionProtocol for GenericRoi {
    fn name(&self) -> &'static str {
        "Generic ROI"
    }

    fn base_roi_text(&self) -> &'static str {
        "Save ROI"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            accepts_reference_frames: true,
            shape_kind: Some(ShapeKind::Polygon),
            ..Capabilities::default()
        }
    }

    fn region_class(&self) -> &'static str {
        "Region"
    }

    fn extract(
        &self,
        input: &ExtractionInput<'_>,
        options: &ExtractionOptions,
    ) -> RoiResult<Region> {
        let image_shape = input.image_shape();
        let main = nth_largest_shape_in_list(input.shapes, 1, options.slice_idx, image_shape)?;
        let core = core_from_shape(main, image_shape)?
            .with_name(options.roi_name.as_deref().unwrap_or("ROI"))
            .with_slice_idx(options.slice());

        debug!(protocol = self.name(), "extracted generic region");
        Ok(Region::new(core, RegionKind::Generic))
    }
}
