//! Sphere tracing against the proxy mesh distance field.
//!
//! The unsigned closest-point distance to a triangle mesh is
//! 1-Lipschitz, so `distance(p) - level` is a safe step size along the
//! ray: marching by it can never overshoot the offset surface. With a
//! nonzero offset on pathological geometry convergence is not formally
//! guaranteed, hence the explicit step cap.

use embrush_math::{Dir3, Vec3};
use embrush_mesh::SpatialIndex;

use crate::camera::Ray;
use crate::progress::ProgressSink;

/// Convergence threshold on the per-step distance.
const CONVERGED_EPS: f64 = 1e-3;

/// Hard cap on marching steps; hitting it counts as a miss.
const MAX_STEPS: usize = 256;

/// Terminal state of one trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    /// The step size fell below the convergence threshold.
    Converged,
    /// The accumulated distance left the far clip, or the step cap hit.
    Missed,
}

/// Outcome of a sphere trace.
#[derive(Debug, Clone, Copy)]
pub struct TraceResult {
    /// Accumulated distance along the ray at termination.
    pub distance: f64,
    /// Surface normal at the closest point to the final position.
    pub normal: Dir3,
    /// Why the march stopped.
    pub state: TraceState,
}

impl TraceResult {
    /// True when the trace converged onto the offset surface.
    pub fn hit(&self) -> bool {
        self.state == TraceState::Converged
    }
}

/// Ray marcher locating the point at offset `level` from the mesh.
#[derive(Debug, Clone, Copy)]
pub struct SphereTracer<'a> {
    index: &'a SpatialIndex,
    far_clip: f64,
}

impl<'a> SphereTracer<'a> {
    /// Create a tracer over `index` bounded by the camera far clip.
    pub fn new(index: &'a SpatialIndex, far_clip: f64) -> Self {
        Self { index, far_clip }
    }

    /// March along `ray` until the distance to the offset surface at
    /// `level` falls below threshold, or the march escapes the far clip.
    pub fn trace(&self, ray: &Ray, level: f64, sink: &mut dyn ProgressSink) -> TraceResult {
        let mut sum = 0.0;
        let mut pos = ray.origin;
        let mut normal = Dir3::new_unchecked(Vec3::y());

        for step in 1..=MAX_STEPS {
            let sp = self.index.closest_point(&pos);
            normal = sp.normal;
            let d = (pos - sp.point).norm() - level;
            pos += d * ray.direction.as_ref();
            sum += d;
            sink.trace_step(step, sum);

            if d < CONVERGED_EPS {
                return TraceResult {
                    distance: sum,
                    normal,
                    state: TraceState::Converged,
                };
            }
            if sum > self.far_clip {
                break;
            }
        }

        TraceResult {
            distance: sum,
            normal,
            state: TraceState::Missed,
        }
    }
}
