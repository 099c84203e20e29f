//! Backend-independent persisted form of a region.
//!
//! A [`RoiRecord`] holds everything needed to rebuild a [`Region`]: the shared core
//! fields, a `class`/`module` type tag, the typed attributes of the region kind, and
//! one level of subregion records. Masks are run-length encoded with [`EncodedMask`].
//!
//! Type tags resolve through an explicit class table. A tag that is not in the table
//! is loaded as a generic region and logged; it never fails the load.

use crate::error::{RoiError, RoiResult};
use crate::geometry::{Mask, Polygon};
use crate::roi::{
    BlobsParams, EllipseParams, FanParams, MustacheParams, Region, RegionKind, RoiCore,
    SubRegion, SubRegionKind, ViewDirection,
};
use ndarray::{Array2, ArrayD, IxDyn, Ix3};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Run-length encoded boolean mask.
///
/// `runs` alternate between `false` and `true` pixels in row-major order, starting
/// with `false` (so the first run may be zero).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedMask {
    /// Mask dimensions
    pub shape: Vec<usize>,
    /// Alternating run lengths
    pub runs: Vec<u64>,
}

impl EncodedMask {
    /// Encode a mask.
    pub fn encode(mask: &Mask) -> Self {
        let mut runs = Vec::new();
        let mut current = false;
        let mut length = 0u64;
        for &px in mask.iter() {
            if px == current {
                length += 1;
            } else {
                runs.push(length);
                current = px;
                length = 1;
            }
        }
        runs.push(length);
        Self {
            shape: mask.shape().to_vec(),
            runs,
        }
    }

    /// Decode back into a mask.
    ///
    /// # Errors
    ///
    /// * [`RoiError::TypeMismatch`] when the runs do not cover the shape exactly, or
    ///   when summing them or multiplying out the shape overflows.
    /// * [`RoiError::Array`] when the shape is not three-dimensional.
    pub fn decode(&self) -> RoiResult<Mask> {
        let overflow = || {
            RoiError::TypeMismatch(format!(
                "mask shape {:?} or its runs overflow the pixel count",
                self.shape
            ))
        };
        let expected = self
            .shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(overflow)?;
        let covered = self
            .runs
            .iter()
            .try_fold(0u64, |acc, &run| acc.checked_add(run))
            .ok_or_else(overflow)?;
        if usize::try_from(covered).ok() != Some(expected) {
            return Err(RoiError::TypeMismatch(format!(
                "mask runs cover {} pixels but shape {:?} has {}",
                covered, self.shape, expected
            )));
        }
        let mut pixels = Vec::with_capacity(expected);
        let mut value = false;
        for &run in &self.runs {
            pixels.extend(std::iter::repeat(value).take(run as usize));
            value = !value;
        }
        let mask = ArrayD::from_shape_vec(IxDyn(&self.shape), pixels)?.into_dimensionality::<Ix3>()?;
        Ok(mask)
    }
}

fn polygon_rows(polygon: &Polygon) -> Vec<Vec<f64>> {
    polygon.outer_iter().map(|row| row.to_vec()).collect()
}

fn polygon_from_rows(rows: &[Vec<f64>]) -> RoiResult<Polygon> {
    let cols = rows.first().map_or(0, Vec::len);
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(Array2::from_shape_vec((rows.len(), cols), flat)?)
}

/// Persisted region or subregion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiRecord {
    /// Display name
    pub name: Option<String>,
    /// Confining plane
    pub slice_idx: Option<usize>,
    /// Type tag: class name
    pub class: String,
    /// Type tag: module path
    pub module: String,
    /// Free-form annotation
    pub info_string: Option<String>,
    /// Mask, if materialized
    pub mask: Option<EncodedMask>,
    /// Mask shape, or image shape for polygon-only regions
    pub shape: Option<Vec<usize>>,
    /// Polygon vertex rows
    pub polygon: Option<Vec<Vec<f64>>>,
    /// Orientation in radians
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<f64>,
    /// View direction, by string value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_direction: Option<ViewDirection>,
    /// Left-right flip flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirrored: Option<bool>,
    /// Ellipse centre exclusion mask
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_mask: Option<EncodedMask>,
    /// Subregion phase in radians
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<f64>,
    /// Glomerulus ordinal phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pseudophase: Option<f64>,
    /// Child records, one level deep
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subregions: Vec<RoiRecord>,
}

impl RoiRecord {
    fn from_core(core: &RoiCore, class: &str, module: &str) -> Self {
        Self {
            name: core.name.clone(),
            slice_idx: core.slice_idx,
            class: class.to_string(),
            module: module.to_string(),
            info_string: core.info_string.clone(),
            mask: core.mask().ok().map(EncodedMask::encode),
            shape: core.shape(),
            polygon: core.raw_polygon().map(polygon_rows),
            orientation: None,
            view_direction: None,
            mirrored: None,
            center_mask: None,
            phase: None,
            pseudophase: None,
            subregions: Vec::new(),
        }
    }

    /// Record for a region and its subregions.
    pub fn from_region(region: &Region) -> Self {
        let mut record =
            Self::from_core(&region.core, region.kind.class_name(), region.kind.module_path());
        match &region.kind {
            RegionKind::Generic => {}
            RegionKind::Ellipse(p) => {
                record.orientation = Some(p.orientation);
                record.view_direction = Some(p.view_direction);
                record.mirrored = Some(p.mirrored);
                record.center_mask = p.center_mask.as_ref().map(EncodedMask::encode);
            }
            RegionKind::Fan(p) => {
                record.orientation = Some(p.orientation);
                record.view_direction = Some(p.view_direction);
                record.mirrored = Some(p.mirrored);
            }
            RegionKind::Blobs(p) => {
                record.orientation = Some(p.orientation);
                record.view_direction = Some(p.view_direction);
            }
            RegionKind::GlobularMustache(p) => {
                record.view_direction = Some(p.view_direction);
            }
        }
        record.subregions = region.subregions().iter().map(Self::from_subregion).collect();
        record
    }

    fn from_subregion(sub: &SubRegion) -> Self {
        let mut record = Self::from_core(&sub.core, sub.kind.class_name(), sub.kind.module_path());
        match sub.kind {
            SubRegionKind::Glomerulus => record.pseudophase = sub.phase,
            _ => record.phase = sub.phase,
        }
        record.view_direction = sub.view_direction;
        record
    }

    fn core(&self) -> RoiResult<RoiCore> {
        let mask = self.mask.as_ref().map(EncodedMask::decode).transpose()?;
        let polygon = self.polygon.as_deref().map(polygon_from_rows).transpose()?;
        let image_shape = if mask.is_some() { None } else { self.shape.clone() };
        let mut core = RoiCore::new(mask, polygon, image_shape)?;
        core.name = self.name.clone();
        core.slice_idx = self.slice_idx;
        core.info_string = self.info_string.clone();
        Ok(core)
    }

    /// Rebuild the region.
    ///
    /// An unknown type tag yields a generic region and a warning.
    ///
    /// # Errors
    ///
    /// [`RoiError::NoRoi`] when the record has no usable geometry; decoding errors
    /// from corrupt masks or polygons.
    pub fn into_region(self) -> RoiResult<Region> {
        let core = self.core()?;
        let kind = match REGION_TYPES.get(self.class.as_str()) {
            Some(build) => build(&self)?,
            None => {
                warn!(
                    class = %self.class,
                    module = %self.module,
                    "unknown region type, loading as generic Region"
                );
                RegionKind::Generic
            }
        };
        let subregions = self
            .subregions
            .into_iter()
            .map(RoiRecord::into_subregion)
            .collect::<RoiResult<Vec<_>>>()?;
        Ok(Region::new(core, kind).with_subregions(subregions))
    }

    fn into_subregion(self) -> RoiResult<SubRegion> {
        let core = self.core()?;
        let kind = subregion_kind(&self.class).unwrap_or_else(|| {
            warn!(class = %self.class, "unknown subregion type, loading as generic SubRegion");
            SubRegionKind::Generic
        });
        let phase = match kind {
            SubRegionKind::Glomerulus => self.pseudophase.or(self.phase),
            _ => self.phase,
        };
        Ok(SubRegion {
            core,
            kind,
            phase,
            view_direction: self.view_direction,
        })
    }
}

type KindBuilder = fn(&RoiRecord) -> RoiResult<RegionKind>;

static REGION_TYPES: Lazy<HashMap<&'static str, KindBuilder>> = Lazy::new(|| {
    let mut types: HashMap<&'static str, KindBuilder> = HashMap::new();
    types.insert("Region", |_| Ok(RegionKind::Generic));
    types.insert("Ellipse", |record| {
        let defaults = EllipseParams::default();
        Ok(RegionKind::Ellipse(EllipseParams {
            orientation: record.orientation.unwrap_or(defaults.orientation),
            center_mask: record.center_mask.as_ref().map(EncodedMask::decode).transpose()?,
            view_direction: record.view_direction.unwrap_or(defaults.view_direction),
            mirrored: record.mirrored.unwrap_or(defaults.mirrored),
        }))
    });
    types.insert("Fan", |record| {
        let defaults = FanParams::default();
        Ok(RegionKind::Fan(FanParams {
            orientation: record.orientation.unwrap_or(defaults.orientation),
            view_direction: record.view_direction.unwrap_or(defaults.view_direction),
            mirrored: record.mirrored.unwrap_or(defaults.mirrored),
        }))
    });
    types.insert("Blobs", |record| {
        let defaults = BlobsParams::default();
        Ok(RegionKind::Blobs(BlobsParams {
            orientation: record.orientation.unwrap_or(defaults.orientation),
            view_direction: record.view_direction.unwrap_or(defaults.view_direction),
        }))
    });
    types.insert("GlobularMustache", |record| {
        let defaults = MustacheParams::default();
        Ok(RegionKind::GlobularMustache(MustacheParams {
            view_direction: record.view_direction.unwrap_or(defaults.view_direction),
        }))
    });
    types
});

/// Region class names that load into their own kind.
pub fn registered_classes() -> Vec<&'static str> {
    let mut classes: Vec<&'static str> = REGION_TYPES.keys().copied().collect();
    classes.sort_unstable();
    classes
}

fn subregion_kind(class: &str) -> Option<SubRegionKind> {
    [
        SubRegionKind::Generic,
        SubRegionKind::Wedge,
        SubRegionKind::Column,
        SubRegionKind::Hemisphere,
        SubRegionKind::Glomerulus,
    ]
    .into_iter()
    .find(|kind| kind.class_name() == class)
}
