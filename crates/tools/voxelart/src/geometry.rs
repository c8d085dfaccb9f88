//! Geometric primitives for surface voxelization
//!
//! Axis-aligned bounds, closest-point queries and the triangle/box overlap
//! test that decides cell occupancy.

use glam::Vec3;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of a point set, `None` when the set is empty
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Length of the longest axis
    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }

    /// Grow the box by `amount` on every side
    pub fn expanded(&self, amount: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }

    /// Inclusive containment test
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Closest point to `p` on segment `a`-`b`
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Find the closest point on a triangle to a given point
///
/// Voronoi-region walk over vertices, edges and face. Zero-area triangles
/// fall back to the nearest of their three edges.
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;

    // Vertex region A
    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    // Vertex region B
    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    // Vertex region C
    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    // Face region
    let sum = va + vb + vc;
    if sum.abs() <= f32::MIN_POSITIVE || !sum.is_finite() {
        return [
            closest_point_on_segment(p, a, b),
            closest_point_on_segment(p, b, c),
            closest_point_on_segment(p, c, a),
        ]
        .into_iter()
        .min_by(|x, y| p.distance_squared(*x).total_cmp(&p.distance_squared(*y)))
        .unwrap_or(a);
    }
    let denom = 1.0 / sum;
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Separating-axis overlap test between a triangle and an axis-aligned box
///
/// Touching counts as overlapping. Tests the 3 box normals, the triangle
/// normal and the 9 edge cross products.
pub fn triangle_intersects_box(center: Vec3, half_extent: Vec3, triangle: [Vec3; 3]) -> bool {
    let v0 = triangle[0] - center;
    let v1 = triangle[1] - center;
    let v2 = triangle[2] - center;

    // Box face normals
    let tri_min = v0.min(v1).min(v2);
    let tri_max = v0.max(v1).max(v2);
    if tri_min.cmpgt(half_extent).any() || tri_max.cmplt(-half_extent).any() {
        return false;
    }

    // Triangle plane
    let edges = [v1 - v0, v2 - v1, v0 - v2];
    let normal = edges[0].cross(edges[1]);
    let radius = half_extent.dot(normal.abs());
    if normal.dot(v0).abs() > radius {
        return false;
    }

    // Edge cross products
    for edge in edges {
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            let axis = axis.cross(edge);
            let p0 = axis.dot(v0);
            let p1 = axis.dot(v1);
            let p2 = axis.dot(v2);
            let radius = half_extent.dot(axis.abs());
            if p0.min(p1).min(p2) > radius || p0.max(p1).max(p2) < -radius {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_aabb_from_points() {
        let aabb =
            Aabb::from_points([Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 4.0, 0.0)]).unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 4.0, 3.0));
        assert_eq!(aabb.max_extent(), 6.0);
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_aabb_union_and_expand() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let u = a.union(&b).expanded(0.5);
        assert_eq!(u.min, Vec3::splat(-0.5));
        assert_eq!(u.max, Vec3::splat(3.5));
        assert!(u.contains(Vec3::splat(1.5)));
        assert!(!u.contains(Vec3::splat(4.0)));
    }

    #[test]
    fn test_closest_point_inside_face() {
        let p = Vec3::new(0.25, 0.25, 1.0);
        let q = closest_point_on_triangle(p, Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!((q - Vec3::new(0.25, 0.25, 0.0)).length() < EPS);
    }

    #[test]
    fn test_closest_point_vertex_and_edge_regions() {
        let (a, b, c) = (Vec3::ZERO, Vec3::X, Vec3::Y);

        let q = closest_point_on_triangle(Vec3::new(-1.0, -1.0, 0.0), a, b, c);
        assert!((q - a).length() < EPS);

        let q = closest_point_on_triangle(Vec3::new(2.0, -0.5, 0.0), a, b, c);
        assert!((q - b).length() < EPS);

        let q = closest_point_on_triangle(Vec3::new(0.5, -1.0, 0.0), a, b, c);
        assert!((q - Vec3::new(0.5, 0.0, 0.0)).length() < EPS);

        let q = closest_point_on_triangle(Vec3::new(1.0, 1.0, 0.0), a, b, c);
        assert!((q - Vec3::new(0.5, 0.5, 0.0)).length() < EPS);
    }

    #[test]
    fn test_closest_point_degenerate_triangle() {
        // Collinear corners
        let q = closest_point_on_triangle(
            Vec3::new(0.5, 1.0, 0.0),
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(2.0, 0.0, 0.0),
        );
        assert!(q.is_finite());
        assert!((q - Vec3::new(0.5, 0.0, 0.0)).length() < EPS);

        let q = closest_point_on_triangle(Vec3::ONE, Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        assert_eq!(q, Vec3::ZERO);
    }

    #[test]
    fn test_triangle_box_overlap() {
        let tri = [Vec3::new(-2.0, -2.0, 0.0), Vec3::new(2.0, -2.0, 0.0), Vec3::new(0.0, 2.0, 0.0)];

        // Plane through the box center
        assert!(triangle_intersects_box(Vec3::ZERO, Vec3::splat(0.5), tri));
        // Box above the plane
        assert!(!triangle_intersects_box(Vec3::new(0.0, 0.0, 1.0), Vec3::splat(0.4), tri));
        // Box beside the slanted edge, inside the triangle's AABB
        assert!(!triangle_intersects_box(Vec3::new(1.8, 1.8, 0.0), Vec3::splat(0.2), tri));
    }

    #[test]
    fn test_triangle_touching_box_face() {
        let tri = [Vec3::new(0.5, -1.0, -1.0), Vec3::new(0.5, 1.0, -1.0), Vec3::new(0.5, 0.0, 1.0)];
        assert!(triangle_intersects_box(Vec3::ZERO, Vec3::splat(0.5), tri));
        assert!(!triangle_intersects_box(Vec3::new(-0.1, 0.0, 0.0), Vec3::splat(0.5), tri));
    }

    #[test]
    fn test_small_triangle_inside_box() {
        let tri = [Vec3::splat(0.1), Vec3::new(0.2, 0.1, 0.1), Vec3::new(0.1, 0.2, 0.1)];
        assert!(triangle_intersects_box(Vec3::ZERO, Vec3::splat(0.5), tri));
    }
}
