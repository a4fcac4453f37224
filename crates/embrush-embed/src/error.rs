//! Error types for stroke embedding.

use thiserror::Error;

/// Errors that can reject a stroke or abort embedding setup.
///
/// Solver non-convergence is deliberately *not* an error: the best-found
/// parameters are still returned and the status is carried in the
/// diagnostics of the successful result.
#[derive(Error, Debug)]
pub enum EmbedError {
    /// The anchor ray never reached the target offset within the far
    /// clip distance. The stroke is rejected; the session continues.
    #[error("initial stroke point must be on the proxy surface")]
    SurfaceMiss,

    /// Fewer than two raster points were supplied.
    #[error("stroke needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    /// Proxy mesh construction or indexing failed.
    #[error(transparent)]
    Mesh(#[from] embrush_mesh::MeshError),
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;
