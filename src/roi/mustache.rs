//! Protocerebral bridge: a cluster of individually delineated glomeruli.
//!
//! Glomeruli arrive already separated (from correlation analysis or manual drawing),
//! so there is nothing to segment. What they lack is an order. The ordering methods
//! below reorder the region's subregions in place and return the permutation they
//! applied: entry `i` is the previous index of the glomerulus now at position `i`.

use super::{Region, RegionKind, RoiCore, SubRegion, SubRegionKind, ViewDirection};
use crate::error::{RoiError, RoiResult};
use crate::geometry::tour::shortest_open_path;
use crate::geometry::{union_into, Mask};
use std::cmp::Ordering;
use std::str::FromStr;
use tracing::{debug, info};

/// Parameters of a glomerulus cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct MustacheParams {
    /// Side the structure was imaged from
    pub view_direction: ViewDirection,
}

impl Default for MustacheParams {
    fn default() -> Self {
        Self {
            view_direction: ViewDirection::Posterior,
        }
    }
}

/// Volume axis used for spatial ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialAxis {
    /// Imaging plane index
    Plane,
    /// Image row, growing downwards
    Y,
    /// Image column, growing to the right
    X,
}

impl SpatialAxis {
    fn index(self) -> usize {
        match self {
            SpatialAxis::Plane => 0,
            SpatialAxis::Y => 1,
            SpatialAxis::X => 2,
        }
    }
}

impl FromStr for SpatialAxis {
    type Err = RoiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plane" | "z" => Ok(SpatialAxis::Plane),
            "y" => Ok(SpatialAxis::Y),
            "x" => Ok(SpatialAxis::X),
            other => Err(RoiError::InvalidParameter(format!(
                "unknown axis '{}', expected plane|z|y|x",
                other
            ))),
        }
    }
}

/// Build a cluster region from pre-segmented glomerulus masks.
///
/// The region mask is the union of the glomeruli. `phases` pairs one optional
/// pseudophase with each glomerulus and is reversed first when `mirrored` is set.
///
/// # Errors
///
/// * [`RoiError::NoRoi`] for an empty glomerulus list.
/// * [`RoiError::InvalidParameter`] when `phases` has the wrong length.
/// * [`RoiError::ShapeMismatch`] when glomerulus masks disagree on shape.
pub fn from_glomeruli(
    glomeruli: Vec<Mask>,
    phases: Option<Vec<Option<f64>>>,
    mirrored: bool,
    params: MustacheParams,
) -> RoiResult<Region> {
    let Some(first) = glomeruli.first() else {
        return Err(RoiError::NoRoi("no glomeruli provided".to_string()));
    };
    let mut phases = phases.unwrap_or_else(|| vec![None; glomeruli.len()]);
    if phases.len() != glomeruli.len() {
        return Err(RoiError::InvalidParameter(format!(
            "{} phases supplied for {} glomeruli",
            phases.len(),
            glomeruli.len()
        )));
    }
    if mirrored {
        phases.reverse();
    }

    let mut union = first.clone();
    for glom in &glomeruli[1..] {
        union_into(&mut union, glom)?;
    }

    let subregions = glomeruli
        .into_iter()
        .zip(phases)
        .map(|(mask, phase)| SubRegion::from_mask(mask, SubRegionKind::Glomerulus, phase))
        .collect();

    Ok(Region::new(RoiCore::from_mask(union), RegionKind::GlobularMustache(params))
        .with_subregions(subregions))
}

impl Region {
    fn require_glomeruli(&self) -> RoiResult<()> {
        match self.kind {
            RegionKind::GlobularMustache(_) => Ok(()),
            _ => Err(RoiError::TypeMismatch(format!(
                "glomerulus ordering needs a GlobularMustache region, got {}",
                self.class_name()
            ))),
        }
    }

    fn apply_order(&mut self, order: &[usize]) {
        let mut taken: Vec<Option<SubRegion>> =
            std::mem::take(self.subregions_mut()).into_iter().map(Some).collect();
        *self.subregions_mut() = order.iter().filter_map(|&i| taken[i].take()).collect();
    }

    /// Sort glomeruli by ascending pseudophase; unphased glomeruli go last.
    pub fn sort_by_pseudophase(&mut self) -> RoiResult<Vec<usize>> {
        self.require_glomeruli()?;
        let mut order: Vec<usize> = (0..self.subregions().len()).collect();
        let phases: Vec<Option<f64>> = self.subregions().iter().map(|g| g.phase).collect();
        order.sort_by(|&a, &b| match (phases[a], phases[b]) {
            (Some(pa), Some(pb)) => pa.total_cmp(&pb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        self.apply_order(&order);
        debug!(?order, "sorted glomeruli by pseudophase");
        Ok(order)
    }

    /// Sort glomeruli by the centre coordinate along `axis`.
    ///
    /// Glomeruli with empty masks go last in either direction.
    pub fn sort_by_axis(&mut self, axis: SpatialAxis, descending: bool) -> RoiResult<Vec<usize>> {
        self.require_glomeruli()?;
        let coords: Vec<Option<f64>> = self
            .subregions()
            .iter()
            .map(|g| g.center_estimate().map(|c| c[axis.index()]))
            .collect();
        let mut order: Vec<usize> = (0..coords.len()).collect();
        order.sort_by(|&a, &b| match (coords[a], coords[b]) {
            (Some(ca), Some(cb)) if descending => cb.total_cmp(&ca),
            (Some(ca), Some(cb)) => ca.total_cmp(&cb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        self.apply_order(&order);
        debug!(?axis, descending, ?order, "sorted glomeruli by position");
        Ok(order)
    }

    /// Order glomeruli along the shortest path through their centres.
    ///
    /// Solved exactly, so `ceiling` bounds the glomerulus count. The path has no
    /// preferred direction: which end is anatomically first must be decided by the
    /// caller, for example with [`Region::sort_by_axis`] on the two endpoints.
    ///
    /// # Errors
    ///
    /// * [`RoiError::NoRoi`] if a glomerulus has an empty mask.
    /// * [`RoiError::InvalidParameter`] above the size ceiling.
    pub fn sort_by_tour(&mut self, ceiling: usize) -> RoiResult<Vec<usize>> {
        self.require_glomeruli()?;
        let centers: Vec<[f64; 3]> = self
            .subregions()
            .iter()
            .enumerate()
            .map(|(i, g)| {
                g.center_estimate()
                    .ok_or_else(|| RoiError::NoRoi(format!("glomerulus {} is empty", i)))
            })
            .collect::<RoiResult<_>>()?;
        let order = shortest_open_path(&centers, ceiling)?;
        self.apply_order(&order);
        info!(glomeruli = order.len(), "ordered glomeruli by shortest path");
        Ok(order)
    }
}
