//! Extraction protocols: strategies that turn raw annotations into a region.
//!
//! Every protocol implements [`ExtractionProtocol`]. Which optional inputs a protocol
//! consumes is declared up front in its [`Capabilities`], so a frontend can decide
//! what to collect from the user before calling [`ExtractionProtocol::extract`].
//!
//! Input shapes are either all masks ("mask mode", combined with boolean algebra) or
//! treated as polygons ("polygon mode", stored as outlines without a mask).

pub mod bridge;
pub mod ellipse;
pub mod fan;
pub mod generic;
pub mod noduli;

use crate::error::RoiResult;
use crate::geometry::{selection::normalize_slice_idx, Mask, Polygon, Shape};
use crate::roi::{Region, RoiCore, ViewDirection};
use ndarray::{ArrayView3, ArrayView4};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use bridge::{
    begin_correlation_analysis, CorrelationCompleter, CorrelationHandle, CorrelationRequest,
    FitVonMises, ManualSegmentation,
};
pub use ellipse::{ExtraRois, FitVonMisesEllipse, UseEllipse};
pub use fan::OutlineFan;
pub use generic::GenericRoi;
pub use noduli::{DrawRoi, Ica};

/// Kind of annotation a protocol expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    /// No preference
    Any,
    /// Closed outline
    Polygon,
    /// Axis-aligned or rotated ellipse outline
    Ellipse,
    /// Boolean mask
    Mask,
    /// Two-point line
    Line,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShapeKind::Any => "any",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Mask => "mask",
            ShapeKind::Line => "line",
        };
        f.write_str(s)
    }
}

/// Optional inputs a protocol consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Reads the raw time series
    pub accepts_frame_data: bool,
    /// Reads the reference (mean) frames; their shape is the image shape
    pub accepts_reference_frames: bool,
    /// Reads an anatomy orientation reference
    pub accepts_anatomy_reference: bool,
    /// Shape kind expected from the annotation layer, `None` if no shapes are read
    pub shape_kind: Option<ShapeKind>,
    /// Subtracts an exclusion mask after extraction
    pub allows_exclusion: bool,
    /// Shape kind expected for the anatomy reference
    pub anatomy_reference_kind: ShapeKind,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            accepts_frame_data: false,
            accepts_reference_frames: false,
            accepts_anatomy_reference: false,
            shape_kind: None,
            allows_exclusion: false,
            anatomy_reference_kind: ShapeKind::Any,
        }
    }
}

/// Data handed to a protocol.
#[derive(Debug, Clone, Default)]
pub struct ExtractionInput<'a> {
    /// Raw annotations
    pub shapes: &'a [Shape],
    /// Orientation reference lines; only the first is used
    pub anatomy_reference: &'a [Polygon],
    /// Reference frames `(planes, y, x)`
    pub reference_frames: Option<ArrayView3<'a, f64>>,
    /// Raw frames `(time, planes, y, x)`
    pub frame_data: Option<ArrayView4<'a, f64>>,
}

impl<'a> ExtractionInput<'a> {
    /// Input with only shapes.
    pub fn from_shapes(shapes: &'a [Shape]) -> Self {
        Self {
            shapes,
            ..Self::default()
        }
    }

    /// Add reference frames.
    pub fn with_reference_frames(mut self, frames: ArrayView3<'a, f64>) -> Self {
        self.reference_frames = Some(frames);
        self
    }

    /// Add anatomy reference lines.
    pub fn with_anatomy_reference(mut self, reference: &'a [Polygon]) -> Self {
        self.anatomy_reference = reference;
        self
    }

    /// Image shape declared by the reference frames.
    pub fn image_shape(&self) -> Option<[usize; 3]> {
        self.reference_frames.map(|frames| {
            let (planes, height, width) = frames.dim();
            [planes, height, width]
        })
    }
}

/// Protocol-specific options. Unset fields take each protocol's default.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOptions {
    /// Plane to extract from; `None` or negative means every plane
    pub slice_idx: Option<i64>,
    /// Name given to the region
    pub roi_name: Option<String>,
    /// Side the structure was imaged from
    pub view_direction: Option<ViewDirection>,
    /// Left-right flipped image
    pub mirrored: Option<bool>,
    /// Role of shapes beyond the largest (ellipse only)
    pub extra_rois: ExtraRois,
    /// Mask subtracted after extraction, where allowed
    pub exclusion: Option<Mask>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            slice_idx: None,
            roi_name: None,
            view_direction: None,
            mirrored: None,
            extra_rois: ExtraRois::Center,
            exclusion: None,
        }
    }
}

impl ExtractionOptions {
    /// Normalized slice index.
    pub fn slice(&self) -> Option<usize> {
        normalize_slice_idx(self.slice_idx)
    }
}

/// A named strategy converting raw annotations into a region.
pub trait ExtractionProtocol: Send + Sync {
    /// Display name, also the lookup key within a catalog category.
    fn name(&self) -> &'static str;

    /// Label for the frontend action that runs the protocol.
    fn base_roi_text(&self) -> &'static str;

    /// Inputs this protocol consumes.
    fn capabilities(&self) -> Capabilities;

    /// Class name of the region this protocol produces.
    fn region_class(&self) -> &'static str;

    /// Build a region.
    fn extract(
        &self,
        input: &ExtractionInput<'_>,
        options: &ExtractionOptions,
    ) -> RoiResult<Region>;
}

impl fmt::Debug for dyn ExtractionProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionProtocol")
            .field("name", &self.name())
            .field("region_class", &self.region_class())
            .finish()
    }
}

/// Core for a selected shape: masks are used as-is, polygons need the image shape.
pub(crate) fn core_from_shape(shape: Shape, image_shape: Option<[usize; 3]>) -> RoiResult<RoiCore> {
    match shape {
        Shape::Mask(mask) => Ok(RoiCore::from_mask(mask)),
        Shape::Polygon(polygon) => {
            RoiCore::new(None, Some(polygon), image_shape.map(|s| s.to_vec()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_image_shape_comes_from_reference_frames() {
        let frames = Array3::<f64>::zeros((2, 8, 6));
        let input = ExtractionInput::from_shapes(&[]).with_reference_frames(frames.view());
        assert_eq!(input.image_shape(), Some([2, 8, 6]));
        assert_eq!(ExtractionInput::default().image_shape(), None);
    }

    #[test]
    fn test_negative_slice_means_all_planes() {
        let options = ExtractionOptions {
            slice_idx: Some(-1),
            ..ExtractionOptions::default()
        };
        assert_eq!(options.slice(), None);
        let options = ExtractionOptions {
            slice_idx: Some(3),
            ..ExtractionOptions::default()
        };
        assert_eq!(options.slice(), Some(3));
    }

    #[test]
    fn test_polygon_core_needs_image_shape() {
        let polygon = Polygon::zeros((4, 2));
        assert!(core_from_shape(Shape::Polygon(polygon.clone()), None).is_err());
        let core = core_from_shape(Shape::Polygon(polygon), Some([1, 5, 5])).unwrap();
        assert!(!core.has_mask());
    }
}
