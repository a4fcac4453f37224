//! Error types for mesh construction and spatial indexing.

use thiserror::Error;

/// Errors that can occur while building the proxy mesh or its index.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Mesh has no vertices.
    #[error("mesh has no vertices")]
    NoVertices,

    /// Mesh has no triangles.
    #[error("mesh has no triangles")]
    NoTriangles,

    /// A face references a vertex that does not exist.
    #[error("face {face} references out-of-range vertex {vertex}")]
    VertexOutOfRange {
        /// Index of the offending face.
        face: usize,
        /// The out-of-range vertex index.
        vertex: u32,
    },
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
