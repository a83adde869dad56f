use itertools::Itertools;
use model::{Coordinate, CoveragePolygon};
use utility::geo::cross;

/// Computes the coverage polygon of a point set.
///
/// - fewer than three points are returned unchanged
/// - otherwise the convex hull in counter-clockwise order, starting at the
///   vertex with the smallest latitude (then smallest longitude), with latitude
///   and longitude treated as planar x and y
/// - an empty polygon if the points do not span an area (all collinear or all
///   the same point)
///
/// Every vertex is one of the input points and appears only once.
pub fn compute_hull(points: &[Coordinate]) -> CoveragePolygon {
    if points.len() < 3 {
        return CoveragePolygon::new(points.to_vec());
    }

    let sorted = points
        .iter()
        .map(Coordinate::as_tuple)
        .sorted_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)))
        .dedup()
        .collect::<Vec<_>>();

    let hull = monotone_chain(&sorted);
    if hull.len() < 3 {
        log::warn!(
            "{} points do not span an area ({} distinct), coverage is empty",
            points.len(),
            sorted.len()
        );
        return CoveragePolygon::empty();
    }

    hull.into_iter().map(Coordinate::from).collect::<Vec<_>>().into()
}

/// Andrew's monotone chain over points sorted by (x, y) without duplicates.
fn monotone_chain(sorted: &[(f64, f64)]) -> Vec<(f64, f64)> {
    if sorted.len() < 3 {
        return sorted.to_vec();
    }

    let mut lower: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    for &point in sorted {
        while lower.len() >= 2
            && cross(lower[lower.len() - 2], lower[lower.len() - 1], point) <= 0.0
        {
            lower.pop();
        }
        lower.push(point);
    }

    let mut upper: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    for &point in sorted.iter().rev() {
        while upper.len() >= 2
            && cross(upper[upper.len() - 2], upper[upper.len() - 1], point) <= 0.0
        {
            upper.pop();
        }
        upper.push(point);
    }

    // the last point of each chain is the first point of the other one
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(points: &[(f64, f64)]) -> Vec<Coordinate> {
        points.iter().copied().map(Coordinate::from).collect()
    }

    #[test]
    fn fewer_than_three_points_pass_through() {
        for points in [
            vec![],
            vec![(5.0, 5.0)],
            vec![(3.0, 1.0), (1.0, 3.0)],
            vec![(1.0, 1.0), (1.0, 1.0)],
        ] {
            let input = coords(&points);
            assert_eq!(compute_hull(&input).vertices(), input.as_slice());
        }
    }

    #[test]
    fn square_with_interior_point() {
        let input = coords(&[(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0), (0.5, 0.5)]);
        let hull = compute_hull(&input);
        assert_eq!(
            hull.vertices(),
            coords(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]).as_slice()
        );
    }

    #[test]
    fn counter_clockwise_order() {
        let input = coords(&[(2.0, 0.0), (0.0, 0.0), (1.0, 3.0), (1.0, 1.0), (3.0, 2.0)]);
        let hull = compute_hull(&input);
        let vertices = hull.vertices();
        assert_eq!(vertices.len(), 4);
        for i in 0..vertices.len() {
            let o = vertices[i].as_tuple();
            let a = vertices[(i + 1) % vertices.len()].as_tuple();
            let b = vertices[(i + 2) % vertices.len()].as_tuple();
            assert!(cross(o, a, b) > 0.0);
        }
    }

    #[test]
    fn collinear_points_give_empty_polygon() {
        let input = coords(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert!(compute_hull(&input).is_empty());

        let same = coords(&[(4.0, 4.0), (4.0, 4.0), (4.0, 4.0)]);
        assert!(compute_hull(&same).is_empty());
    }

    #[test]
    fn duplicates_do_not_repeat_vertices() {
        let input = coords(&[
            (0.0, 0.0),
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 0.0),
            (1.0, 2.0),
            (1.0, 2.0),
        ]);
        assert_eq!(
            compute_hull(&input).vertices(),
            coords(&[(0.0, 0.0), (2.0, 0.0), (1.0, 2.0)]).as_slice()
        );
    }

    #[test]
    fn points_on_edges_are_not_vertices() {
        let input = coords(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]);
        assert_eq!(compute_hull(&input).len(), 4);
    }

    #[test]
    fn independent_of_input_order() {
        let points = [(0.3, 0.1), (5.0, 1.0), (2.0, 4.0), (1.0, 1.0), (4.0, 4.5), (0.0, 3.0)];
        let forward = compute_hull(&coords(&points));
        let mut reversed = points;
        reversed.reverse();
        assert_eq!(forward, compute_hull(&coords(&reversed)));
    }
}
