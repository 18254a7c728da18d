// src/shape_analysis.rs - Geometry of a single droplet region

use nalgebra::{distance, Point2};
use serde::Serialize;
use std::f64::consts::PI;

/// Axis-aligned bounding rectangle in pixel coordinates (inclusive origin, exclusive extent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Integer center, as used for label placement
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Smallest circle containing every boundary point of a region
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnclosingCircle {
    pub center: (f64, f64),
    pub radius: f64,
}

impl EnclosingCircle {
    pub fn diameter(&self) -> f64 {
        2.0 * self.radius
    }

    fn contains(&self, p: &Point2<f64>) -> bool {
        distance(&Point2::new(self.center.0, self.center.1), p) <= self.radius + 1e-7
    }

    fn from_point(p: &Point2<f64>) -> Self {
        Self { center: (p.x, p.y), radius: 0.0 }
    }

    fn from_two(a: &Point2<f64>, b: &Point2<f64>) -> Self {
        let mid = nalgebra::center(a, b);
        Self {
            center: (mid.x, mid.y),
            radius: distance(a, b) / 2.0,
        }
    }

    /// Circumcircle of three points; collinear triples fall back to the
    /// widest pair
    fn from_three(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> Self {
        let ab = b - a;
        let ac = c - a;
        let d = 2.0 * (ab.x * ac.y - ab.y * ac.x);

        if d.abs() < 1e-12 {
            return [Self::from_two(a, b), Self::from_two(a, c), Self::from_two(b, c)]
                .into_iter()
                .fold(Self::from_point(a), |best, circle| {
                    if circle.radius > best.radius { circle } else { best }
                });
        }

        let ab_sq = ab.norm_squared();
        let ac_sq = ac.norm_squared();
        let ux = (ac.y * ab_sq - ab.y * ac_sq) / d;
        let uy = (ab.x * ac_sq - ac.x * ab_sq) / d;
        let center = Point2::new(a.x + ux, a.y + uy);

        Self {
            center: (center.x, center.y),
            radius: distance(&center, a),
        }
    }
}

/// Minimal enclosing circle of a point set (incremental Welzl construction).
/// Points are visited in their given order, so the result is deterministic.
pub fn minimal_enclosing_circle(points: &[(u32, u32)]) -> EnclosingCircle {
    let points: Vec<Point2<f64>> = points
        .iter()
        .map(|&(x, y)| Point2::new(x as f64, y as f64))
        .collect();

    let Some(first) = points.first() else {
        return EnclosingCircle { center: (0.0, 0.0), radius: 0.0 };
    };

    let mut circle = EnclosingCircle::from_point(first);
    for i in 1..points.len() {
        if circle.contains(&points[i]) {
            continue;
        }
        circle = EnclosingCircle::from_point(&points[i]);
        for j in 0..i {
            if circle.contains(&points[j]) {
                continue;
            }
            circle = EnclosingCircle::from_two(&points[i], &points[j]);
            for k in 0..j {
                if !circle.contains(&points[k]) {
                    circle = EnclosingCircle::from_three(&points[i], &points[j], &points[k]);
                }
            }
        }
    }

    circle
}

/// Calculate the perimeter of a closed boundary from its ordered points
pub fn calculate_perimeter(boundary: &[(u32, u32)]) -> f64 {
    if boundary.len() < 2 {
        return 0.0;
    }

    let n = boundary.len();
    (0..n)
        .map(|i| {
            let (x1, y1) = boundary[i];
            let (x2, y2) = boundary[(i + 1) % n]; // Wrap around to first point
            let dx = x2 as f64 - x1 as f64;
            let dy = y2 as f64 - y1 as f64;
            (dx * dx + dy * dy).sqrt()
        })
        .sum()
}

/// Area enclosed by a closed boundary polygon (shoelace formula).
/// Holes inside the boundary count as enclosed; spurs traced out and back add nothing.
pub fn polygon_area(boundary: &[(u32, u32)]) -> f64 {
    if boundary.len() < 3 {
        return 0.0;
    }

    let n = boundary.len();
    let twice_signed: f64 = (0..n)
        .map(|i| {
            let (x1, y1) = boundary[i];
            let (x2, y2) = boundary[(i + 1) % n];
            x1 as f64 * y2 as f64 - x2 as f64 * y1 as f64
        })
        .sum();

    twice_signed.abs() / 2.0
}

/// Calculate circularity of the shape (4π * Area / Perimeter²)
/// Area and perimeter must come from the same boundary polygon.
/// 1.0 for a perfect circle, < 1.0 for other shapes, 0.0 for a degenerate perimeter
pub fn calculate_circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }

    (4.0 * PI * area) / (perimeter * perimeter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn enclosing_circle_of_a_diameter_pair() {
        let circle = minimal_enclosing_circle(&[(0, 0), (10, 0), (5, 1)]);
        assert_approx_eq!(circle.radius, 5.0, 1e-9);
        assert_approx_eq!(circle.center.0, 5.0, 1e-9);
        assert_approx_eq!(circle.center.1, 0.0, 1e-9);
    }

    #[test]
    fn enclosing_circle_of_a_triangle() {
        // Right triangle: hypotenuse is the diameter
        let circle = minimal_enclosing_circle(&[(0, 0), (6, 0), (0, 8)]);
        assert_approx_eq!(circle.diameter(), 10.0, 1e-9);

        // Acute triangle needs the circumcircle
        let circle = minimal_enclosing_circle(&[(0, 0), (4, 0), (2, 3)]);
        for &(x, y) in &[(0.0, 0.0), (4.0, 0.0), (2.0, 3.0)] {
            let d = ((x - circle.center.0).powi(2) + (y - circle.center.1).powi(2)).sqrt();
            assert_approx_eq!(d, circle.radius, 1e-9);
        }
    }

    #[test]
    fn enclosing_circle_of_a_square_ring() {
        let ring = [(0, 0), (4, 0), (4, 4), (0, 4), (2, 0), (4, 2), (2, 4), (0, 2)];
        let circle = minimal_enclosing_circle(&ring);
        assert_approx_eq!(circle.center.0, 2.0, 1e-9);
        assert_approx_eq!(circle.center.1, 2.0, 1e-9);
        assert_approx_eq!(circle.radius, 8.0f64.sqrt(), 1e-9);
    }

    #[test]
    fn enclosing_circle_of_nothing_and_one() {
        assert_eq!(minimal_enclosing_circle(&[]).radius, 0.0);
        let single = minimal_enclosing_circle(&[(3, 7)]);
        assert_eq!(single.center, (3.0, 7.0));
        assert_eq!(single.radius, 0.0);
    }

    #[test]
    fn collinear_points() {
        let circle = minimal_enclosing_circle(&[(0, 0), (2, 0), (6, 0), (4, 0)]);
        assert_approx_eq!(circle.radius, 3.0, 1e-9);
    }

    #[test]
    fn perimeter_of_square_boundary() {
        let boundary = [(0, 0), (1, 0), (2, 0), (2, 1), (2, 2), (1, 2), (0, 2), (0, 1)];
        assert_approx_eq!(calculate_perimeter(&boundary), 8.0, 1e-12);
        assert_eq!(calculate_perimeter(&[(1, 1)]), 0.0);
    }

    #[test]
    fn circularity_bounds() {
        // Ideal circle of radius 10
        let circularity = calculate_circularity(PI * 100.0, 2.0 * PI * 10.0);
        assert_approx_eq!(circularity, 1.0, 1e-12);

        assert_eq!(calculate_circularity(50.0, 0.0), 0.0);
        assert!(calculate_circularity(20.0, 42.0) < 0.2);
    }

    #[test]
    fn polygon_area_of_boundaries() {
        // Boundary of a 3x3 block runs through pixel centres: a 2x2 square
        let square = [(0, 0), (1, 0), (2, 0), (2, 1), (2, 2), (1, 2), (0, 2), (0, 1)];
        assert_approx_eq!(polygon_area(&square), 4.0, 1e-12);

        // Orientation does not matter
        let reversed: Vec<(u32, u32)> = square.iter().rev().copied().collect();
        assert_approx_eq!(polygon_area(&reversed), 4.0, 1e-12);

        // A line traced out and back encloses nothing
        assert_eq!(polygon_area(&[(0, 0), (1, 0), (2, 0), (1, 0)]), 0.0);
        assert_eq!(polygon_area(&[(3, 3)]), 0.0);
    }

    #[test]
    fn small_square_is_less_round_than_a_circle() {
        let square = [(0, 0), (1, 0), (2, 0), (2, 1), (2, 2), (1, 2), (0, 2), (0, 1)];
        let circularity = calculate_circularity(polygon_area(&square), calculate_perimeter(&square));
        assert_approx_eq!(circularity, PI / 4.0, 1e-12);
    }

    #[test]
    fn bounding_box_center() {
        let bbox = BoundingBox { x: 10, y: 20, width: 5, height: 8 };
        assert_eq!(bbox.center(), (12, 24));
    }
}
