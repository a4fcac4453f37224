//! Exact closest point on a single triangle.

use embrush_math::{Point3, Vec3};

/// Closest point to `p` on triangle `(a, b, c)`.
///
/// Voronoi-region case analysis: classify `p` against the vertex,
/// edge, and interior regions of the triangle and project accordingly.
pub fn closest_point_triangle(p: &Point3, a: &Point3, b: &Point3, c: &Point3) -> Point3 {
    let ab: Vec3 = b - a;
    let ac: Vec3 = c - a;
    let ap: Vec3 = p - a;

    // Vertex region A
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    // Vertex region B
    let bp: Vec3 = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    // Edge region AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + v * ab;
    }

    // Vertex region C
    let cp: Vec3 = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    // Edge region AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + w * ac;
    }

    // Edge region BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + w * (c - b);
    }

    // Interior
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri() -> (Point3, Point3, Point3) {
        (
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        )
    }

    #[test]
    fn test_interior_projection() {
        let (a, b, c) = tri();
        let q = closest_point_triangle(&Point3::new(0.5, 0.5, 3.0), &a, &b, &c);
        assert!((q - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_vertex_regions() {
        let (a, b, c) = tri();
        let q = closest_point_triangle(&Point3::new(-1.0, -1.0, 0.0), &a, &b, &c);
        assert!((q - a).norm() < 1e-12);
        let q = closest_point_triangle(&Point3::new(5.0, -1.0, 0.0), &a, &b, &c);
        assert!((q - b).norm() < 1e-12);
        let q = closest_point_triangle(&Point3::new(-1.0, 5.0, 0.0), &a, &b, &c);
        assert!((q - c).norm() < 1e-12);
    }

    #[test]
    fn test_edge_regions() {
        let (a, b, c) = tri();
        // Below edge AB
        let q = closest_point_triangle(&Point3::new(1.0, -2.0, 0.0), &a, &b, &c);
        assert!((q - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        // Left of edge AC
        let q = closest_point_triangle(&Point3::new(-2.0, 1.0, 0.0), &a, &b, &c);
        assert!((q - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
        // Beyond the hypotenuse BC
        let q = closest_point_triangle(&Point3::new(2.0, 2.0, 0.0), &a, &b, &c);
        assert!((q - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_point_on_triangle_is_fixed() {
        let (a, b, c) = tri();
        let p = Point3::new(0.25, 0.25, 0.0);
        let q = closest_point_triangle(&p, &a, &b, &c);
        assert!((q - p).norm() < 1e-12);
    }
}
