//! Region-of-interest entity model.
//!
//! A [`Region`] owns a mask (or a polygon embedded in an image shape), its metadata,
//! a [`RegionKind`] carrying the anatomy-specific parameters, and an ordered list of
//! [`SubRegion`] fragments that stays empty until [`Region::segment`] runs.
//!
//! The anatomy-specific pieces live in submodules:
//!
//! - [`ellipse`]: ellipsoid body, angular wedges around a centre
//! - [`fan`]: fan-shaped body, triangular columns radiating from a hub point
//! - [`blobs`]: paired noduli hemispheres ordered left-first
//! - [`mustache`]: protocerebral bridge glomeruli with phase, axis and tour ordering

pub mod blobs;
pub mod ellipse;
pub mod fan;
pub mod mustache;

use crate::error::{RoiError, RoiResult};
use crate::geometry::{plane_centroid, union_into, volume_centroid, Mask, Polygon};
use ndarray::{stack, Array3, Array4, ArrayView3, Axis, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub use blobs::BlobsParams;
pub use ellipse::EllipseParams;
pub use fan::{FanParams, FanSegmentationMethod};
pub use mustache::{MustacheParams, SpatialAxis};

/// Side of a bilaterally symmetric structure the imaging was performed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewDirection {
    /// Imaged from the front of the head
    Anterior,
    /// Imaged from the back of the head
    Posterior,
    /// Not recorded
    #[default]
    Undefined,
}

impl ViewDirection {
    /// Stored string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewDirection::Anterior => "anterior",
            ViewDirection::Posterior => "posterior",
            ViewDirection::Undefined => "undefined",
        }
    }
}

impl fmt::Display for ViewDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewDirection {
    type Err = RoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anterior" => Ok(ViewDirection::Anterior),
            "posterior" => Ok(ViewDirection::Posterior),
            "undefined" => Ok(ViewDirection::Undefined),
            other => Err(RoiError::InvalidParameter(format!(
                "unknown view direction '{}', expected anterior|posterior|undefined",
                other
            ))),
        }
    }
}

/// Geometry and metadata shared by regions and subregions.
///
/// Either a mask or a polygon with its image shape must be present. When both a mask
/// and a polygon are stored the mask wins.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiCore {
    mask: Option<Mask>,
    polygon: Option<Polygon>,
    image_shape: Option<Vec<usize>>,
    /// Plane the region is confined to, `None` for every plane
    pub slice_idx: Option<usize>,
    /// Display name, may be absent
    pub name: Option<String>,
    /// Free-form annotation carried through persistence
    pub info_string: Option<String>,
}

impl RoiCore {
    /// Build from any combination of mask, polygon and image shape.
    ///
    /// # Errors
    ///
    /// [`RoiError::NoRoi`] unless a mask, or a polygon together with an image shape,
    /// is supplied.
    pub fn new(
        mask: Option<Mask>,
        polygon: Option<Polygon>,
        image_shape: Option<Vec<usize>>,
    ) -> RoiResult<Self> {
        let usable = mask.is_some() || (polygon.is_some() && image_shape.is_some());
        if !usable {
            return Err(RoiError::NoRoi(
                "ROI must be defined with either a mask or a polygon and image shape".to_string(),
            ));
        }
        Ok(Self {
            mask,
            polygon,
            image_shape,
            slice_idx: None,
            name: None,
            info_string: None,
        })
    }

    /// Mask-backed core; never fails.
    pub fn from_mask(mask: Mask) -> Self {
        Self {
            mask: Some(mask),
            polygon: None,
            image_shape: None,
            slice_idx: None,
            name: None,
            info_string: None,
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the confining plane.
    pub fn with_slice_idx(mut self, slice_idx: Option<usize>) -> Self {
        self.slice_idx = slice_idx;
        self
    }

    /// The mask.
    ///
    /// # Errors
    ///
    /// [`RoiError::Unsupported`] for polygon-only cores; rasterizing polygons is not
    /// implemented.
    pub fn mask(&self) -> RoiResult<&Mask> {
        self.mask
            .as_ref()
            .ok_or_else(|| RoiError::Unsupported("mask from polygon".to_string()))
    }

    pub(crate) fn mask_mut(&mut self) -> RoiResult<&mut Mask> {
        self.mask
            .as_mut()
            .ok_or_else(|| RoiError::Unsupported("mask from polygon".to_string()))
    }

    /// Whether a mask is materialized.
    pub fn has_mask(&self) -> bool {
        self.mask.is_some()
    }

    /// The polygon.
    ///
    /// # Errors
    ///
    /// [`RoiError::Unsupported`] when only a mask is stored; tracing outlines from
    /// masks is not implemented.
    pub fn polygon(&self) -> RoiResult<&Polygon> {
        self.polygon
            .as_ref()
            .ok_or_else(|| RoiError::Unsupported("polygon from mask".to_string()))
    }

    /// The stored polygon, if any, without the unsupported-operation error.
    pub fn raw_polygon(&self) -> Option<&Polygon> {
        self.polygon.as_ref()
    }

    /// Shape of the mask, or the declared image shape for polygon-only cores.
    pub fn shape(&self) -> Option<Vec<usize>> {
        match &self.mask {
            Some(mask) => Some(mask.shape().to_vec()),
            None => self.image_shape.clone(),
        }
    }

    /// Bytes identifying the geometry, used for content-addressed file names.
    pub(crate) fn geometry_bytes(&self) -> Vec<u8> {
        if let Some(mask) = &self.mask {
            return mask.iter().map(|&px| u8::from(px)).collect();
        }
        self.polygon
            .iter()
            .flat_map(|p| p.iter().flat_map(|v| v.to_le_bytes()))
            .collect()
    }

    /// Centre of mass.
    ///
    /// With `plane == None` (or when the core is confined to a slice) this is the
    /// volume centroid `[plane, y, x]`; otherwise the `[y, x]` centroid of that plane.
    /// `Ok(None)` for empty masks or out-of-range planes.
    pub fn center(&self, plane: Option<usize>) -> RoiResult<Option<Vec<f64>>> {
        let mask = self.mask()?;
        let plane = if self.slice_idx.is_some() { None } else { plane };
        Ok(match plane {
            None => volume_centroid(mask.view()).map(|c| c.to_vec()),
            Some(p) if p < mask.len_of(Axis(0)) => {
                plane_centroid(mask.index_axis(Axis(0), p)).map(|(y, x)| vec![y, x])
            }
            Some(_) => None,
        })
    }
}

/// Anatomy-specific parameters of a region.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionKind {
    /// Plain region with no segmentation
    Generic,
    /// Ellipsoid body
    Ellipse(EllipseParams),
    /// Fan-shaped body
    Fan(FanParams),
    /// Paired noduli
    Blobs(BlobsParams),
    /// Protocerebral bridge glomeruli
    GlobularMustache(MustacheParams),
}

impl RegionKind {
    /// Class name used for display, type tags and file names.
    pub fn class_name(&self) -> &'static str {
        match self {
            RegionKind::Generic => "Region",
            RegionKind::Ellipse(_) => "Ellipse",
            RegionKind::Fan(_) => "Fan",
            RegionKind::Blobs(_) => "Blobs",
            RegionKind::GlobularMustache(_) => "GlobularMustache",
        }
    }

    /// Module path stored next to the class name.
    pub fn module_path(&self) -> &'static str {
        match self {
            RegionKind::Generic => "neuro_roi::roi",
            RegionKind::Ellipse(_) => "neuro_roi::roi::ellipse",
            RegionKind::Fan(_) => "neuro_roi::roi::fan",
            RegionKind::Blobs(_) => "neuro_roi::roi::blobs",
            RegionKind::GlobularMustache(_) => "neuro_roi::roi::mustache",
        }
    }

    fn subregion_label(&self) -> &'static str {
        match self {
            RegionKind::Generic => "subregions",
            RegionKind::Ellipse(_) => "wedges",
            RegionKind::Fan(_) => "columns",
            RegionKind::Blobs(_) => "hemispheres",
            RegionKind::GlobularMustache(_) => "glomeruli",
        }
    }

    /// Orientation in radians, for kinds that carry one.
    pub fn orientation(&self) -> Option<f64> {
        match self {
            RegionKind::Ellipse(p) => Some(p.orientation),
            RegionKind::Fan(p) => Some(p.orientation),
            RegionKind::Blobs(p) => Some(p.orientation),
            RegionKind::Generic | RegionKind::GlobularMustache(_) => None,
        }
    }

    /// Stored view direction, for kinds that carry one.
    pub fn view_direction(&self) -> Option<ViewDirection> {
        match self {
            RegionKind::Ellipse(p) => Some(p.view_direction),
            RegionKind::Fan(p) => Some(p.view_direction),
            RegionKind::Blobs(p) => Some(p.view_direction),
            RegionKind::GlobularMustache(p) => Some(p.view_direction),
            RegionKind::Generic => None,
        }
    }
}

/// Kind of fragment a subregion represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubRegionKind {
    /// Fragment with no specific role
    Generic,
    /// Angular sector of an ellipse
    Wedge,
    /// Triangular column of a fan
    Column,
    /// One side of a blob pair
    Hemisphere,
    /// One glomerulus of the protocerebral bridge
    Glomerulus,
}

impl SubRegionKind {
    /// Class name used for type tags.
    pub fn class_name(&self) -> &'static str {
        match self {
            SubRegionKind::Generic => "SubRegion",
            SubRegionKind::Wedge => "Wedge",
            SubRegionKind::Column => "Column",
            SubRegionKind::Hemisphere => "Hemisphere",
            SubRegionKind::Glomerulus => "Glomerulus",
        }
    }

    /// Module path stored next to the class name.
    pub fn module_path(&self) -> &'static str {
        match self {
            SubRegionKind::Generic => "neuro_roi::roi",
            SubRegionKind::Wedge => "neuro_roi::roi::ellipse",
            SubRegionKind::Column => "neuro_roi::roi::fan",
            SubRegionKind::Hemisphere => "neuro_roi::roi::blobs",
            SubRegionKind::Glomerulus => "neuro_roi::roi::mustache",
        }
    }

    /// Name the phase is stored under. Glomeruli carry an ordinal pseudophase.
    pub fn phase_attr(&self) -> &'static str {
        match self {
            SubRegionKind::Glomerulus => "pseudophase",
            _ => "phase",
        }
    }
}

/// Fragment of a region produced by segmentation; always a subset of its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRegion {
    /// Geometry and metadata
    pub core: RoiCore,
    /// Fragment role
    pub kind: SubRegionKind,
    /// Phase in radians, or an ordinal position for glomeruli and hemispheres
    pub phase: Option<f64>,
    /// View direction the fragment was segmented under
    pub view_direction: Option<ViewDirection>,
}

impl SubRegion {
    /// Mask-backed fragment.
    pub fn from_mask(mask: Mask, kind: SubRegionKind, phase: Option<f64>) -> Self {
        Self {
            core: RoiCore::from_mask(mask),
            kind,
            phase,
            view_direction: None,
        }
    }

    /// The fragment mask.
    pub fn mask(&self) -> RoiResult<&Mask> {
        self.core.mask()
    }

    /// Volume centre `[plane, y, x]`.
    ///
    /// Falls back to the mean vertex of a polygon-only fragment (plane 0 for
    /// two-column polygons). `None` when no pixel or vertex exists.
    pub fn center_estimate(&self) -> Option<[f64; 3]> {
        if let Ok(mask) = self.core.mask() {
            return volume_centroid(mask.view());
        }
        let polygon = self.core.raw_polygon()?;
        let (n_vertices, n_coords) = polygon.dim();
        if n_vertices == 0 || n_coords < 2 {
            return None;
        }
        let mean = polygon.mean_axis(Axis(0))?;
        let plane = if n_coords >= 3 { mean[0] } else { 0.0 };
        Some([plane, mean[n_coords - 2], mean[n_coords - 1]])
    }
}

/// Options for [`Region::segment`].
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOptions {
    /// Number of fragments; `None` uses the region type's default
    pub n_segments: Option<usize>,
    /// View direction; `None` uses the direction stored on the region
    pub view_direction: Option<ViewDirection>,
    /// Fan segmentation method
    pub fan_method: FanSegmentationMethod,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            n_segments: None,
            view_direction: None,
            fan_method: FanSegmentationMethod::Triangles,
        }
    }
}

impl SegmentOptions {
    /// Request a segment count.
    pub fn with_segments(mut self, n_segments: usize) -> Self {
        self.n_segments = Some(n_segments);
        self
    }

    /// Request a view direction.
    pub fn viewed_from(mut self, view_direction: ViewDirection) -> Self {
        self.view_direction = Some(view_direction);
        self
    }
}

/// One anatomical region of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Geometry and metadata
    pub core: RoiCore,
    /// Anatomy-specific parameters
    pub kind: RegionKind,
    subregions: Vec<SubRegion>,
}

impl Region {
    /// Region of the given kind with no subregions.
    pub fn new(core: RoiCore, kind: RegionKind) -> Self {
        Self {
            core,
            kind,
            subregions: Vec::new(),
        }
    }

    /// Generic region backed by a mask.
    pub fn generic(mask: Mask) -> Self {
        Self::new(RoiCore::from_mask(mask), RegionKind::Generic)
    }

    /// Attach subregions, replacing any existing ones.
    pub fn with_subregions(mut self, subregions: Vec<SubRegion>) -> Self {
        self.subregions = subregions;
        self
    }

    /// Union of several regions.
    ///
    /// A single region is returned unchanged. Two or more are OR-ed into a new
    /// generic region carrying only the fused mask.
    ///
    /// # Errors
    ///
    /// [`RoiError::NoRoi`] for an empty list; mask errors from the inputs.
    pub fn from_rois(rois: Vec<Region>) -> RoiResult<Region> {
        let mut iter = rois.into_iter();
        let Some(first) = iter.next() else {
            return Err(RoiError::NoRoi("No ROIs provided to fuse".to_string()));
        };
        let mut rest = iter.peekable();
        if rest.peek().is_none() {
            return Ok(first);
        }
        let mut fused = first.core.mask()?.clone();
        for roi in rest {
            union_into(&mut fused, roi.core.mask()?)?;
        }
        Ok(Region::generic(fused))
    }

    /// Class name of the region kind.
    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Name, or the empty string when unnamed.
    pub fn name(&self) -> &str {
        self.core.name.as_deref().unwrap_or("")
    }

    /// The region mask.
    pub fn mask(&self) -> RoiResult<&Mask> {
        self.core.mask()
    }

    /// Centre of mass, see [`RoiCore::center`].
    pub fn center(&self, plane: Option<usize>) -> RoiResult<Option<Vec<f64>>> {
        self.core.center(plane)
    }

    /// OR `other`'s mask into this one in place, returning the fused mask.
    pub fn fuse(&mut self, other: &Region) -> RoiResult<&Mask> {
        let other_mask = other.core.mask()?;
        let mask = self.core.mask_mut()?;
        union_into(mask, other_mask)?;
        Ok(mask)
    }

    /// Ordered subregions, empty until segmented.
    pub fn subregions(&self) -> &[SubRegion] {
        &self.subregions
    }

    /// Take ownership of the subregions.
    pub fn into_subregions(self) -> Vec<SubRegion> {
        self.subregions
    }

    pub(crate) fn subregions_mut(&mut self) -> &mut Vec<SubRegion> {
        &mut self.subregions
    }

    /// Subdivide the region into ordered subregions, replacing existing ones.
    ///
    /// # Errors
    ///
    /// * [`RoiError::NoRoi`] for generic regions, which have no segmentation.
    /// * [`RoiError::InvalidParameter`] for a zero segment count.
    /// * [`RoiError::Unsupported`] for polygon-only regions and unimplemented methods.
    pub fn segment(&mut self, options: &SegmentOptions) -> RoiResult<()> {
        if options.n_segments == Some(0) {
            return Err(RoiError::InvalidParameter(
                "n_segments must be at least 1".to_string(),
            ));
        }
        let slice_idx = self.core.slice_idx;
        let subregions = match &self.kind {
            RegionKind::Generic => {
                return Err(RoiError::NoRoi("This ROI has no segment method".to_string()))
            }
            RegionKind::Ellipse(params) => {
                let n = options.n_segments.unwrap_or(ellipse::DEFAULT_SEGMENTS);
                let view = options.view_direction.unwrap_or(params.view_direction);
                ellipse::segment(self.core.mask()?, params, n, view)?
            }
            RegionKind::Fan(params) => {
                let n = options.n_segments.unwrap_or(fan::DEFAULT_SEGMENTS);
                let view = options.view_direction.unwrap_or(params.view_direction);
                fan::segment(self.core.mask()?, params, n, options.fan_method, view)?
            }
            RegionKind::Blobs(params) => {
                let view = options.view_direction.unwrap_or(params.view_direction);
                blobs::reorder_hemispheres(
                    self.subregions.clone(),
                    params.orientation,
                    view,
                )?
            }
            // glomeruli are delineated upstream
            RegionKind::GlobularMustache(_) => return Ok(()),
        };

        self.subregions = subregions
            .into_iter()
            .map(|mut sub| {
                sub.core.slice_idx = slice_idx;
                sub
            })
            .collect();
        info!(
            region = self.class_name(),
            n_subregions = self.subregions.len(),
            "segmented region"
        );
        Ok(())
    }

    /// Subregion masks stacked along a new leading axis.
    ///
    /// # Errors
    ///
    /// [`RoiError::NoRoi`] when the region has no subregions.
    pub fn subregion_masks(&self) -> RoiResult<Array4<bool>> {
        if self.subregions.is_empty() {
            return Err(RoiError::NoRoi("No subROIs assigned to this ROI".to_string()));
        }
        let views: Vec<ArrayView3<'_, bool>> = self
            .subregions
            .iter()
            .map(|sub| sub.mask().map(|m| m.view()))
            .collect::<RoiResult<_>>()?;
        Ok(stack(Axis(0), &views)?)
    }

    /// Label image: 0 is background, `i + 1` marks the i-th subregion.
    ///
    /// Where subregions overlap the later one wins.
    pub fn labeled_subregions(&self) -> RoiResult<Array3<u32>> {
        let masks = self.subregion_masks()?;
        let (_, planes, height, width) = masks.dim();
        let mut labels = Array3::<u32>::zeros((planes, height, width));
        for (i, sub) in masks.axis_iter(Axis(0)).enumerate() {
            let label = u32::try_from(i + 1).unwrap_or(u32::MAX);
            Zip::from(&mut labels).and(&sub).for_each(|l, &inside| {
                if inside {
                    *l = label;
                }
            });
        }
        Ok(labels)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ROI of class {}", self.class_name())?;
        writeln!(f)?;
        if !self.name().is_empty() {
            writeln!(f, "\tNamed {}", self.name())?;
        }
        match self.center(None) {
            Ok(Some(center)) => {
                let coords: Vec<String> = center.iter().map(|c| format!("{:.2}", c)).collect();
                writeln!(f, "\tCentered at ({})", coords.join(", "))?
            }
            Ok(None) => writeln!(f, "\tEmpty mask")?,
            Err(_) => writeln!(f, "\tPolygon only, no mask")?,
        }
        match self.core.slice_idx {
            Some(idx) => writeln!(f, "\tRestricted to slice {}", idx)?,
            None => writeln!(f, "\tSpans all slices")?,
        }
        if !self.subregions.is_empty() {
            writeln!(
                f,
                "\tSegmented into {} {}",
                self.subregions.len(),
                self.kind.subregion_label()
            )?;
        }
        if let Some(view) = self.kind.view_direction() {
            writeln!(f, "\tViewed from {} direction", view)?;
        }
        if let Some(orientation) = self.kind.orientation() {
            writeln!(f, "\tOrientation {:.4}", orientation)?;
        }
        Ok(())
    }
}
