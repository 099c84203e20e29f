//! Geometry utilities shared by the extraction protocols and segmentation algorithms.
//!
//! Everything in this module is pure array computation on `ndarray` types:
//!
//! - [`Mask`]: boolean volume indexed `(plane, y, x)`. A 2-D image is a one-plane volume.
//! - [`Polygon`]: vertex table whose last two columns are `(y, x)` in image coordinates.
//! - [`Shape`]: one raw annotation, either a mask or a polygon.
//!
//! Submodules hold the heavier pieces: shape ranking ([`selection`]), complex-number
//! angular helpers ([`angular`]) and exact tour ordering ([`tour`]).

pub mod angular;
pub mod selection;
pub mod tour;

use crate::error::{RoiError, RoiResult};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

pub use selection::{n_largest_shapes_in_list, nth_largest_shape_in_list};

/// Boolean mask over an imaging volume, indexed `(plane, y, x)`.
pub type Mask = Array3<bool>;

/// Polygon vertices, one row per vertex.
///
/// The last two columns are `(y, x)`. With three or more columns the first column
/// is the plane the polygon was drawn on.
pub type Polygon = Array2<f64>;

/// A single raw annotation handed to an extraction protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Pixel mask, `true` inside the shape
    Mask(Mask),
    /// Vertex outline
    Polygon(Polygon),
}

impl Shape {
    /// Returns true for mask shapes.
    pub fn is_mask(&self) -> bool {
        matches!(self, Shape::Mask(_))
    }

    /// Borrow the mask, if this shape is one.
    pub fn as_mask(&self) -> Option<&Mask> {
        match self {
            Shape::Mask(mask) => Some(mask),
            Shape::Polygon(_) => None,
        }
    }

    /// Borrow the polygon, if this shape is one.
    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Shape::Polygon(polygon) => Some(polygon),
            Shape::Mask(_) => None,
        }
    }

    /// Take the mask, if this shape is one.
    pub fn into_mask(self) -> Option<Mask> {
        match self {
            Shape::Mask(mask) => Some(mask),
            Shape::Polygon(_) => None,
        }
    }

    /// Take the polygon, if this shape is one.
    pub fn into_polygon(self) -> Option<Polygon> {
        match self {
            Shape::Polygon(polygon) => Some(polygon),
            Shape::Mask(_) => None,
        }
    }
}

impl From<Mask> for Shape {
    fn from(mask: Mask) -> Self {
        Shape::Mask(mask)
    }
}

impl From<Polygon> for Shape {
    fn from(polygon: Polygon) -> Self {
        Shape::Polygon(polygon)
    }
}

/// Mask mode applies only when every shape is a mask; anything else is polygon mode.
pub fn all_masks(shapes: &[Shape]) -> bool {
    !shapes.is_empty() && shapes.iter().all(Shape::is_mask)
}

/// Shoelace area of a polygon, using only the last two coordinate columns.
///
/// Always non-negative, so the result does not depend on winding direction or on
/// which vertex the outline starts from.
pub fn polygon_area(vertices: ArrayView2<'_, f64>) -> f64 {
    let (n_vertices, n_coords) = vertices.dim();
    if n_vertices == 0 || n_coords < 2 {
        return 0.0;
    }
    let x = vertices.column(n_coords - 1);
    let y = vertices.column(n_coords - 2);

    let mut x_dot_prev_y = 0.0;
    let mut y_dot_prev_x = 0.0;
    for i in 0..n_vertices {
        let prev = (i + n_vertices - 1) % n_vertices;
        x_dot_prev_y += x[i] * y[prev];
        y_dot_prev_x += y[i] * x[prev];
    }
    0.5 * (x_dot_prev_y - y_dot_prev_x).abs()
}

/// Number of `true` pixels.
pub fn pixel_count(mask: ArrayView3<'_, bool>) -> usize {
    mask.iter().filter(|&&px| px).count()
}

/// Number of `true` pixels in one plane.
pub fn plane_pixel_count(plane: ArrayView2<'_, bool>) -> usize {
    plane.iter().filter(|&&px| px).count()
}

/// Centre of mass `(y, x)` of one plane, or `None` when the plane is empty.
pub fn plane_centroid(plane: ArrayView2<'_, bool>) -> Option<(f64, f64)> {
    let mut count = 0usize;
    let (mut sum_y, mut sum_x) = (0.0, 0.0);
    for ((y, x), &inside) in plane.indexed_iter() {
        if inside {
            count += 1;
            sum_y += y as f64;
            sum_x += x as f64;
        }
    }
    if count == 0 {
        return None;
    }
    Some((sum_y / count as f64, sum_x / count as f64))
}

/// Centre of mass `[plane, y, x]` of a volume, or `None` when the mask is empty.
pub fn volume_centroid(mask: ArrayView3<'_, bool>) -> Option<[f64; 3]> {
    let mut count = 0usize;
    let mut sums = [0.0f64; 3];
    for ((z, y, x), &inside) in mask.indexed_iter() {
        if inside {
            count += 1;
            sums[0] += z as f64;
            sums[1] += y as f64;
            sums[2] += x as f64;
        }
    }
    if count == 0 {
        return None;
    }
    let n = count as f64;
    Some([sums[0] / n, sums[1] / n, sums[2] / n])
}

fn check_same_shape(a: &Mask, b: &Mask) -> RoiResult<()> {
    if a.shape() != b.shape() {
        return Err(RoiError::ShapeMismatch {
            expected: a.shape().to_vec(),
            found: b.shape().to_vec(),
        });
    }
    Ok(())
}

/// In-place logical OR.
pub fn union_into(target: &mut Mask, other: &Mask) -> RoiResult<()> {
    check_same_shape(target, other)?;
    Zip::from(target).and(other).for_each(|t, &o| *t = *t || o);
    Ok(())
}

/// In-place logical AND.
pub fn intersect_into(target: &mut Mask, other: &Mask) -> RoiResult<()> {
    check_same_shape(target, other)?;
    Zip::from(target).and(other).for_each(|t, &o| *t = *t && o);
    Ok(())
}

/// In-place `target AND NOT other`.
pub fn subtract_into(target: &mut Mask, other: &Mask) -> RoiResult<()> {
    check_same_shape(target, other)?;
    Zip::from(target).and(other).for_each(|t, &o| *t = *t && !o);
    Ok(())
}

/// Copy of `mask` with every plane other than `plane` cleared.
pub fn restrict_to_plane(mask: &Mask, plane: usize) -> Mask {
    let mut out = Mask::from_elem(mask.dim(), false);
    if plane < mask.len_of(Axis(0)) {
        out.index_axis_mut(Axis(0), plane)
            .assign(&mask.index_axis(Axis(0), plane));
    }
    out
}

/// Lift a 2-D image mask into a one-plane volume.
pub fn mask_from_image(image: Array2<bool>) -> Mask {
    image.insert_axis(Axis(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn unit_square() -> Polygon {
        array![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
    }

    #[test]
    fn test_unit_square_area() {
        assert!((polygon_area(unit_square().view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_area_ignores_start_vertex_and_winding() {
        let square = unit_square();
        let rotated = array![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
        let mut reversed = square.clone();
        reversed.invert_axis(Axis(0));

        let area = polygon_area(square.view());
        assert!((polygon_area(rotated.view()) - area).abs() < 1e-12);
        assert!((polygon_area(reversed.view()) - area).abs() < 1e-12);
    }

    #[test]
    fn test_area_uses_last_two_columns() {
        // plane index in the first column must not change the area
        let square_on_plane = array![
            [3.0, 0.0, 0.0],
            [3.0, 0.0, 2.0],
            [3.0, 2.0, 2.0],
            [3.0, 2.0, 0.0]
        ];
        assert!((polygon_area(square_on_plane.view()) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_polygons() {
        let empty = Polygon::zeros((0, 2));
        assert_eq!(polygon_area(empty.view()), 0.0);
        let line = array![[0.0, 0.0], [5.0, 5.0]];
        assert_eq!(polygon_area(line.view()), 0.0);
    }

    #[test]
    fn test_plane_centroid() {
        let mut plane = Array2::from_elem((5, 5), false);
        plane[[1, 1]] = true;
        plane[[3, 3]] = true;
        assert_eq!(plane_centroid(plane.view()), Some((2.0, 2.0)));
        assert_eq!(plane_centroid(Array2::from_elem((2, 2), false).view()), None);
    }

    #[test]
    fn test_boolean_algebra() {
        let mut a = Mask::from_elem((1, 2, 2), false);
        let mut b = Mask::from_elem((1, 2, 2), false);
        a[[0, 0, 0]] = true;
        b[[0, 0, 1]] = true;

        let mut union = a.clone();
        union_into(&mut union, &b).unwrap();
        assert_eq!(pixel_count(union.view()), 2);

        subtract_into(&mut union, &a).unwrap();
        assert_eq!(union, b);

        let wrong = Mask::from_elem((2, 2, 2), false);
        assert!(matches!(
            intersect_into(&mut a, &wrong),
            Err(RoiError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_restrict_to_plane() {
        let mask = Mask::from_elem((3, 2, 2), true);
        let restricted = restrict_to_plane(&mask, 1);
        assert_eq!(pixel_count(restricted.view()), 4);
        assert!(restricted[[1, 0, 0]]);
        assert!(!restricted[[0, 0, 0]]);
    }
}
