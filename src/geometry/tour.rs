//! Exact shortest open path through a small set of points.
//!
//! A virtual depot at zero distance from every point turns the open-path problem into
//! a closed tour. The tour is solved exactly with Held–Karp dynamic programming, then
//! rotated to start at the depot and the depot is dropped. Since every edge touching
//! the depot is free, this is the same as the cheapest Hamiltonian path with free
//! endpoints, which is what the DP below computes directly.
//!
//! Memory and time grow as `2^n · n`, so inputs are capped at [`MAX_TOUR_NODES`].

use crate::error::{RoiError, RoiResult};
use ndarray::Array2;
use tracing::debug;

/// Hard ceiling of the solver. Configuration may lower it, never raise it.
pub const MAX_TOUR_NODES: usize = 20;

/// Ceiling applied when no configuration is given.
pub const DEFAULT_TOUR_CEILING: usize = 18;

const NO_PARENT: u8 = u8::MAX;

fn distance_matrix(points: &[[f64; 3]]) -> Array2<f64> {
    let n = points.len();
    Array2::from_shape_fn((n, n), |(a, b)| {
        points[a]
            .iter()
            .zip(points[b].iter())
            .map(|(p, q)| (p - q).powi(2))
            .sum::<f64>()
            .sqrt()
    })
}

/// Visit order of `points` minimising total Euclidean path length.
///
/// Returns indices into `points`. Reversing the result gives a path of equal length;
/// ties are broken towards lower indices, so the output is deterministic.
///
/// # Errors
///
/// [`RoiError::InvalidParameter`] when `points.len()` exceeds `ceiling` (itself
/// clamped to [`MAX_TOUR_NODES`]).
pub fn shortest_open_path(points: &[[f64; 3]], ceiling: usize) -> RoiResult<Vec<usize>> {
    let n = points.len();
    let ceiling = ceiling.min(MAX_TOUR_NODES);
    if n > ceiling {
        return Err(RoiError::InvalidParameter(format!(
            "tour ordering is limited to {} glomeruli, got {}",
            ceiling, n
        )));
    }
    if n <= 1 {
        return Ok((0..n).collect());
    }

    let dist = distance_matrix(points);
    let full = (1usize << n) - 1;
    let mut cost = vec![f64::INFINITY; (full + 1) * n];
    let mut parent = vec![NO_PARENT; (full + 1) * n];

    // leaving the depot is free
    for start in 0..n {
        cost[(1 << start) * n + start] = 0.0;
    }

    for visited in 1..=full {
        for last in 0..n {
            if visited & (1 << last) == 0 {
                continue;
            }
            let here = cost[visited * n + last];
            if !here.is_finite() {
                continue;
            }
            for next in 0..n {
                if visited & (1 << next) != 0 {
                    continue;
                }
                let grown = visited | (1 << next);
                let candidate = here + dist[[last, next]];
                if candidate < cost[grown * n + next] {
                    cost[grown * n + next] = candidate;
                    parent[grown * n + next] = last as u8;
                }
            }
        }
    }

    // returning to the depot is free too, so any endpoint closes the tour
    let (mut last, best) = (0..n)
        .map(|end| (end, cost[full * n + end]))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| RoiError::InvalidParameter("empty tour".to_string()))?;

    let mut order = Vec::with_capacity(n);
    let mut visited = full;
    loop {
        order.push(last);
        let prev = parent[visited * n + last];
        visited &= !(1 << last);
        if prev == NO_PARENT {
            break;
        }
        last = usize::from(prev);
    }
    order.reverse();

    debug!(nodes = n, length = best, "solved open tour");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_x_axis(xs: &[f64]) -> Vec<[f64; 3]> {
        xs.iter().map(|&x| [0.0, 0.0, x]).collect()
    }

    fn path_length(points: &[[f64; 3]], order: &[usize]) -> f64 {
        let dist = distance_matrix(points);
        order.windows(2).map(|w| dist[[w[0], w[1]]]).sum()
    }

    #[test]
    fn test_colinear_points_never_cross() {
        // every arrangement of x = 0, 10, 20
        let layouts: [[f64; 3]; 6] = [
            [0.0, 10.0, 20.0],
            [0.0, 20.0, 10.0],
            [10.0, 0.0, 20.0],
            [10.0, 20.0, 0.0],
            [20.0, 0.0, 10.0],
            [20.0, 10.0, 0.0],
        ];
        for xs in layouts {
            let points = on_x_axis(&xs);
            let order = shortest_open_path(&points, DEFAULT_TOUR_CEILING).unwrap();
            let visited: Vec<f64> = order.iter().map(|&i| xs[i]).collect();
            assert!(
                visited == vec![0.0, 10.0, 20.0] || visited == vec![20.0, 10.0, 0.0],
                "crossing order {:?} for layout {:?}",
                visited,
                xs
            );
        }
    }

    #[test]
    fn test_tour_is_a_permutation() {
        let points: Vec<[f64; 3]> = (0..7)
            .map(|i| {
                let t = i as f64;
                [0.0, (t * 1.3).sin() * 5.0, t * 3.0]
            })
            .collect();
        let mut order = shortest_open_path(&points, DEFAULT_TOUR_CEILING).unwrap();
        let length = path_length(&points, &order);
        order.sort_unstable();
        assert_eq!(order, (0..7).collect::<Vec<_>>());
        assert!(length.is_finite());
    }

    #[test]
    fn test_tour_beats_index_order() {
        let points = on_x_axis(&[0.0, 30.0, 10.0, 20.0]);
        let order = shortest_open_path(&points, DEFAULT_TOUR_CEILING).unwrap();
        assert!((path_length(&points, &order) - 30.0).abs() < 1e-9);
        assert!(path_length(&points, &[0, 1, 2, 3]) > 30.0);
    }

    #[test]
    fn test_trivial_inputs() {
        assert!(shortest_open_path(&[], 5).unwrap().is_empty());
        assert_eq!(shortest_open_path(&[[1.0, 2.0, 3.0]], 5).unwrap(), vec![0]);
    }

    #[test]
    fn test_ceiling_boundary() {
        let at_ceiling = on_x_axis(&[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(shortest_open_path(&at_ceiling, 4).unwrap().len(), 4);

        let over = on_x_axis(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let err = shortest_open_path(&over, 4).unwrap_err();
        assert!(matches!(err, RoiError::InvalidParameter(_)));
        assert!(err.to_string().contains("limited to 4 glomeruli, got 5"));
    }

    #[test]
    fn test_large_ceiling_clamps_to_solver_limit() {
        let too_many = on_x_axis(&vec![0.0; MAX_TOUR_NODES + 1]);
        for ceiling in [MAX_TOUR_NODES + 1, 100, usize::MAX] {
            let err = shortest_open_path(&too_many, ceiling).unwrap_err();
            assert!(matches!(err, RoiError::InvalidParameter(_)));
            assert!(
                err.to_string().contains("limited to 20 glomeruli, got 21"),
                "{}",
                err
            );
        }
    }
}
