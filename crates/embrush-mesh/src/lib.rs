#![warn(missing_docs)]

//! Proxy mesh and closest-point spatial index for the embrush engine.
//!
//! The stroke embedding pipeline treats the proxy surface as a static
//! triangle soup: built once at session start, then queried thousands of
//! times per stroke (one closest-point query per point per solver
//! iteration). This crate provides:
//!
//! - [`TriangleMesh`] - immutable vertex / index-triple storage
//! - [`closest`] - exact closest point on a single triangle
//! - [`SpatialIndex`] - SAH BVH answering closest-point and distance
//!   queries in sub-linear expected time

pub mod closest;
pub mod error;
pub mod index;

pub use closest::closest_point_triangle;
pub use error::{MeshError, Result};
pub use index::{SpatialIndex, SurfacePoint};

use embrush_math::{Aabb3, Dir3, Point3};

/// An immutable triangle mesh: vertex positions plus index triples.
///
/// Built once from externally loaded geometry and never mutated; the
/// spatial index holds a shared handle for its whole lifetime.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    vertices: Vec<Point3>,
    faces: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create a mesh from vertices and triangle index triples.
    ///
    /// Every face index must be in range; a mesh with no vertices is
    /// rejected. An empty face list is allowed here but rejected by
    /// [`SpatialIndex::build`].
    pub fn new(vertices: Vec<Point3>, faces: Vec<[u32; 3]>) -> Result<Self> {
        if vertices.is_empty() {
            return Err(MeshError::NoVertices);
        }
        for (fi, face) in faces.iter().enumerate() {
            for &vi in face {
                if vi as usize >= vertices.len() {
                    return Err(MeshError::VertexOutOfRange {
                        face: fi,
                        vertex: vi,
                    });
                }
            }
        }
        Ok(Self { vertices, faces })
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.faces.len()
    }

    /// Vertex positions of triangle `i`.
    pub fn triangle(&self, i: u32) -> (Point3, Point3, Point3) {
        let [a, b, c] = self.faces[i as usize];
        (
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }

    /// Normal of triangle `i`, sign fixed by vertex winding.
    pub fn face_normal(&self, i: u32) -> Dir3 {
        let (a, b, c) = self.triangle(i);
        Dir3::new_normalize((b - a).cross(&(c - a)))
    }

    /// Bounding box over all vertices.
    pub fn aabb(&self) -> Aabb3 {
        let mut aabb = Aabb3::empty();
        for v in &self.vertices {
            aabb.include_point(v);
        }
        aabb
    }
}

/// Mesh fixtures shared by tests in this crate and downstream crates.
#[doc(hidden)]
pub mod test_meshes {
    use super::TriangleMesh;
    use embrush_math::Point3;

    /// `n x n` grid in the xz plane with a sinusoidal height field,
    /// spanning `[0, 10]` in x and z. Triangles wind so normals point +y.
    pub fn wavy_grid(n: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for i in 0..=n {
            for j in 0..=n {
                let x = 10.0 * i as f64 / n as f64;
                let z = 10.0 * j as f64 / n as f64;
                let y = (x * 0.7).sin() * (z * 0.5).cos();
                vertices.push(Point3::new(x, y, z));
            }
        }
        let mut faces = Vec::new();
        let stride = (n + 1) as u32;
        for i in 0..n as u32 {
            for j in 0..n as u32 {
                let v00 = i * stride + j;
                let v01 = v00 + 1;
                let v10 = v00 + stride;
                let v11 = v10 + 1;
                faces.push([v00, v01, v10]);
                faces.push([v01, v11, v10]);
            }
        }
        TriangleMesh::new(vertices, faces).unwrap()
    }

    /// Two triangles forming a square plane at `y = 0`, spanning
    /// `[-half, half]` in x and z, normals pointing +y.
    pub fn flat_plane(half: f64) -> TriangleMesh {
        let vertices = vec![
            Point3::new(-half, 0.0, -half),
            Point3::new(half, 0.0, -half),
            Point3::new(half, 0.0, half),
            Point3::new(-half, 0.0, half),
        ];
        let faces = vec![[0, 2, 1], [0, 3, 2]];
        TriangleMesh::new(vertices, faces).unwrap()
    }

    /// UV sphere of radius `radius` centered at the origin.
    pub fn uv_sphere(radius: f64, segments: usize, rings: usize) -> TriangleMesh {
        use std::f64::consts::PI;

        let mut vertices = Vec::new();
        for r in 0..=rings {
            let theta = PI * r as f64 / rings as f64;
            for s in 0..segments {
                let phi = 2.0 * PI * s as f64 / segments as f64;
                vertices.push(Point3::new(
                    radius * theta.sin() * phi.cos(),
                    radius * theta.cos(),
                    radius * theta.sin() * phi.sin(),
                ));
            }
        }
        let mut faces = Vec::new();
        let seg = segments as u32;
        for r in 0..rings as u32 {
            for s in 0..seg {
                let s1 = (s + 1) % seg;
                let v00 = r * seg + s;
                let v01 = r * seg + s1;
                let v10 = (r + 1) * seg + s;
                let v11 = (r + 1) * seg + s1;
                // Pole rings collapse one edge; skip the degenerate triangle.
                if r > 0 {
                    faces.push([v00, v01, v10]);
                }
                if r < rings as u32 - 1 {
                    faces.push([v01, v11, v10]);
                }
            }
        }
        TriangleMesh::new(vertices, faces).unwrap()
    }
}
