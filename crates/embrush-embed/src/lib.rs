#![warn(missing_docs)]

//! Stroke-to-surface embedding for the embrush engine.
//!
//! Turns an ordered sequence of 2D raster points plus a camera snapshot
//! into an ordered sequence of 3D points lying at a controlled offset
//! from the proxy surface:
//!
//! - [`camera`] - pinhole ray generation from raster positions
//! - [`trace`] - sphere tracing for the initial per-point guess
//! - [`solver`] - L-BFGS minimization over the ray parameters
//! - [`energy`] - the composite level / angle / length objective
//! - [`embed`] - per-tool initialization and orchestration
//!
//! # Example
//!
//! ```ignore
//! use embrush_embed::{embed, EmbeddingContext, NullSink, Tool, ToolConfig, Viewport};
//!
//! let index = SpatialIndex::build(&mesh)?;
//! let ctx = EmbeddingContext {
//!     index: &index,
//!     camera,
//!     viewport: Viewport { width: 1280, height: 720 },
//!     config: ToolConfig { tool: Tool::Level, level: 5.0, level_offset: 0.0 },
//! };
//! let stroke = embed(&ctx, &raster_points, &mut NullSink)?;
//! println!("{}", stroke.diagnostics.status_line());
//! ```

pub mod camera;
pub mod embed;
pub mod energy;
pub mod error;
pub mod progress;
pub mod solver;
pub mod tool;
pub mod trace;

pub use camera::{CameraFrame, Ray, Viewport};
pub use embed::{
    embed, resample_by_spacing, EmbedDiagnostics, EmbeddedStroke, EmbeddingContext,
};
pub use energy::StrokeEnergy;
pub use error::{EmbedError, Result};
pub use progress::{LogSink, NullSink, ProgressSink};
pub use solver::{LbfgsOutcome, LbfgsParams, Objective, SolverStatus};
pub use tool::{Tool, ToolConfig};
pub use trace::{SphereTracer, TraceResult, TraceState};

/// Camera fixtures shared by tests across this crate.
#[cfg(test)]
pub(crate) mod fixtures {
    use crate::camera::CameraFrame;
    use embrush_math::{Point3, Vec3};
    use std::f64::consts::FRAC_PI_2;

    /// Camera at `(0, height, 0)` looking straight down `-y`, with a
    /// 90 degree vertical field of view.
    pub fn downward_camera(height: f64, far: f64) -> CameraFrame {
        CameraFrame {
            position: Point3::new(0.0, height, 0.0),
            u: Vec3::x(),
            v: -Vec3::z(),
            w: Vec3::y(),
            fov_y: FRAC_PI_2,
            near: 0.01,
            far,
        }
    }
}
