//! Closest-point spatial index over the proxy mesh.
//!
//! A bounding volume hierarchy built with the surface area heuristic
//! (SAH). Unlike a ray-tracing BVH, traversal is driven by point-to-box
//! distance: children are visited nearest-first and whole subtrees are
//! pruned once they cannot beat the best distance found so far.

use std::sync::Arc;

use embrush_math::{Aabb3, Dir3, Point3};

use crate::closest::closest_point_triangle;
use crate::error::{MeshError, Result};
use crate::TriangleMesh;

/// Result of a closest-point query.
#[derive(Debug, Clone, Copy)]
pub struct SurfacePoint {
    /// Nearest point on the mesh surface.
    pub point: Point3,
    /// Normal of the triangle that supplied the point (sign per vertex winding).
    pub normal: Dir3,
    /// Index of that triangle.
    pub triangle: u32,
}

/// A BVH node - either a leaf containing triangles or an internal node
/// with two children.
#[derive(Debug, Clone)]
enum BvhNode {
    Leaf {
        aabb: Aabb3,
        triangles: Vec<u32>,
    },
    Internal {
        aabb: Aabb3,
        left: Box<BvhNode>,
        right: Box<BvhNode>,
    },
}

impl BvhNode {
    fn aabb(&self) -> &Aabb3 {
        match self {
            BvhNode::Leaf { aabb, .. } => aabb,
            BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// Closest-point acceleration structure over a [`TriangleMesh`].
///
/// Immutable once built; queries take `&self` only, so the index can be
/// shared freely. For a fixed build, equidistant-triangle ties resolve
/// deterministically (fixed traversal order, strict improvement test).
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    root: BvhNode,
    mesh: Arc<TriangleMesh>,
}

impl SpatialIndex {
    /// Build an index over all triangles of `mesh`.
    ///
    /// Fails with [`MeshError::NoTriangles`] on an empty triangle set,
    /// which makes a query on a triangle-less index unrepresentable.
    pub fn build(mesh: &TriangleMesh) -> Result<Self> {
        if mesh.num_triangles() == 0 {
            return Err(MeshError::NoTriangles);
        }
        let mesh = Arc::new(mesh.clone());

        let mut tri_data: Vec<(u32, Aabb3, Point3)> = (0..mesh.num_triangles() as u32)
            .map(|i| {
                let (a, b, c) = mesh.triangle(i);
                let mut aabb = Aabb3::empty();
                aabb.include_point(&a);
                aabb.include_point(&b);
                aabb.include_point(&c);
                (i, aabb, aabb.center())
            })
            .collect();

        let root = build_node(&mut tri_data);
        Ok(Self { root, mesh })
    }

    /// The underlying mesh.
    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// Nearest surface point to `p`.
    pub fn closest_point(&self, p: &Point3) -> SurfacePoint {
        let mut best_d2 = f64::INFINITY;
        let mut best_point = Point3::origin();
        let mut best_tri = 0u32;
        self.closest_node(p, &self.root, &mut best_d2, &mut best_point, &mut best_tri);
        SurfacePoint {
            point: best_point,
            normal: self.mesh.face_normal(best_tri),
            triangle: best_tri,
        }
    }

    /// Unsigned distance from `p` to the mesh surface.
    pub fn distance(&self, p: &Point3) -> f64 {
        (p - self.closest_point(p).point).norm()
    }

    fn closest_node(
        &self,
        p: &Point3,
        node: &BvhNode,
        best_d2: &mut f64,
        best_point: &mut Point3,
        best_tri: &mut u32,
    ) {
        if node.aabb().distance_sq_to_point(p) > *best_d2 {
            return;
        }
        match node {
            BvhNode::Leaf { triangles, .. } => {
                for &tri in triangles {
                    let (a, b, c) = self.mesh.triangle(tri);
                    let q = closest_point_triangle(p, &a, &b, &c);
                    let d2 = (p - q).norm_squared();
                    if d2 < *best_d2 {
                        *best_d2 = d2;
                        *best_point = q;
                        *best_tri = tri;
                    }
                }
            }
            BvhNode::Internal { left, right, .. } => {
                let left_d2 = left.aabb().distance_sq_to_point(p);
                let right_d2 = right.aabb().distance_sq_to_point(p);
                if left_d2 <= right_d2 {
                    self.closest_node(p, left, best_d2, best_point, best_tri);
                    self.closest_node(p, right, best_d2, best_point, best_tri);
                } else {
                    self.closest_node(p, right, best_d2, best_point, best_tri);
                    self.closest_node(p, left, best_d2, best_point, best_tri);
                }
            }
        }
    }
}

/// Build a BVH node recursively using SAH.
fn build_node(tri_data: &mut [(u32, Aabb3, Point3)]) -> BvhNode {
    let mut bounds = Aabb3::empty();
    for (_, aabb, _) in tri_data.iter() {
        bounds.include_aabb(aabb);
    }

    // Base case: small number of triangles -> leaf
    if tri_data.len() <= 4 {
        return BvhNode::Leaf {
            aabb: bounds,
            triangles: tri_data.iter().map(|(i, _, _)| *i).collect(),
        };
    }

    let (best_axis, best_pos) = find_best_split(tri_data, &bounds);
    let mid = partition_triangles(tri_data, best_axis, best_pos);

    // Fallback if the SAH partition degenerates: split in the middle
    let mid = if mid == 0 || mid == tri_data.len() {
        tri_data.len() / 2
    } else {
        mid
    };

    let (left_data, right_data) = tri_data.split_at_mut(mid);
    BvhNode::Internal {
        aabb: bounds,
        left: Box::new(build_node(left_data)),
        right: Box::new(build_node(right_data)),
    }
}

/// Find the best split axis and position using SAH.
fn find_best_split(tri_data: &[(u32, Aabb3, Point3)], bounds: &Aabb3) -> (usize, f64) {
    const NUM_BUCKETS: usize = 12;

    let extent = bounds.max - bounds.min;

    let mut best_cost = f64::INFINITY;
    let mut best_axis = 0;
    let mut best_pos = 0.0;

    for axis in 0..3 {
        let axis_extent = extent[axis];
        if axis_extent < 1e-10 {
            continue;
        }
        let axis_min = bounds.min[axis];

        let mut bucket_counts = [0usize; NUM_BUCKETS];
        let mut bucket_bounds = [Aabb3::empty(); NUM_BUCKETS];

        for (_, aabb, centroid) in tri_data {
            let b = ((centroid[axis] - axis_min) / axis_extent * NUM_BUCKETS as f64) as usize;
            let b = b.min(NUM_BUCKETS - 1);
            bucket_counts[b] += 1;
            bucket_bounds[b].include_aabb(aabb);
        }

        for split in 1..NUM_BUCKETS {
            let mut left_count = 0;
            let mut left_bounds = Aabb3::empty();
            for i in 0..split {
                left_count += bucket_counts[i];
                if bucket_counts[i] > 0 {
                    left_bounds.include_aabb(&bucket_bounds[i]);
                }
            }

            let mut right_count = 0;
            let mut right_bounds = Aabb3::empty();
            for i in split..NUM_BUCKETS {
                right_count += bucket_counts[i];
                if bucket_counts[i] > 0 {
                    right_bounds.include_aabb(&bucket_bounds[i]);
                }
            }

            if left_count == 0 || right_count == 0 {
                continue;
            }

            // SAH cost: traversal + P(left) * N_left + P(right) * N_right
            let total_area = bounds.surface_area();
            let cost = 0.125
                + left_bounds.surface_area() / total_area * left_count as f64
                + right_bounds.surface_area() / total_area * right_count as f64;

            if cost < best_cost {
                best_cost = cost;
                best_axis = axis;
                best_pos = axis_min + (split as f64 / NUM_BUCKETS as f64) * axis_extent;
            }
        }
    }

    (best_axis, best_pos)
}

/// Partition triangles by centroid along an axis.
fn partition_triangles(tri_data: &mut [(u32, Aabb3, Point3)], axis: usize, pos: f64) -> usize {
    let mut left = 0;
    let mut right = tri_data.len();

    while left < right {
        if tri_data[left].2[axis] < pos {
            left += 1;
        } else {
            right -= 1;
            tri_data.swap(left, right);
        }
    }

    left
}
