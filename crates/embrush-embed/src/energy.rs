//! Composite stroke energy and its analytic gradient.
//!
//! The optimization variable is the vector of ray parameters `t`; every
//! evaluation reconstructs `p_i = origin + t_i * dir_i` and accumulates
//! three terms:
//!
//! - level: squared deviation of the mesh distance from the target
//!   offset, on the points the tool selects
//! - angle: squared deviation from collinearity of each consecutive
//!   point triple (plus a heavily weighted pseudo-triple against the
//!   root anchor for rooted tools)
//! - length: squared consecutive distances, for rooted tools only

use embrush_math::{Dir3, Point3, Vec3};
use embrush_mesh::SpatialIndex;
use nalgebra::DVector;

use crate::solver::Objective;
use crate::tool::ToolConfig;

/// Weight of the level term.
const W_LEVEL: f64 = 1.0;

/// Extra weight factor on the root-anchor pseudo-triple.
const ROOT_ANCHOR_WEIGHT: f64 = 1e4;

/// When a point sits closer to the surface than this, the closest-point
/// offset direction is numerically meaningless; substitute the surface
/// normal.
const ON_SURFACE_EPS: f64 = 1e-4;

/// Energy over the ray parameters of one stroke.
pub struct StrokeEnergy<'a> {
    index: &'a SpatialIndex,
    origin: Point3,
    dirs: &'a [Dir3],
    config: ToolConfig,
    root_anchor: Option<Point3>,
}

impl<'a> StrokeEnergy<'a> {
    /// Create the energy for a stroke with fixed rays.
    ///
    /// `root_anchor` must be `Some` exactly for tools with a rooted
    /// stroke origin.
    pub fn new(
        index: &'a SpatialIndex,
        origin: Point3,
        dirs: &'a [Dir3],
        config: ToolConfig,
        root_anchor: Option<Point3>,
    ) -> Self {
        Self {
            index,
            origin,
            dirs,
            config,
            root_anchor,
        }
    }
}

impl Objective for StrokeEnergy<'_> {
    fn evaluate(&self, x: &DVector<f64>, grad: &mut DVector<f64>) -> f64 {
        let n = self.dirs.len();
        let tool = self.config.tool;

        let points: Vec<Point3> = (0..n)
            .map(|i| self.origin + x[i] * self.dirs[i].as_ref())
            .collect();

        let mut energy = 0.0;

        // Level term
        for i in 0..n {
            let Some(target) = tool.level_target(i, n, &self.config) else {
                continue;
            };
            let sp = self.index.closest_point(&points[i]);
            let offset: Vec3 = points[i] - sp.point;
            let f = offset.norm();
            let grad_dir = if f < ON_SURFACE_EPS {
                sp.normal.into_inner()
            } else {
                offset / f
            };
            let resid = f - target;
            energy += W_LEVEL * resid * resid;
            grad[i] += W_LEVEL * 2.0 * resid * grad_dir.dot(self.dirs[i].as_ref());
        }

        // Angle term
        let w_angle = tool.angle_weight();
        if let Some(anchor) = &self.root_anchor {
            energy += angle_triple(
                [anchor, &points[0], &points[1]],
                [None, Some((0, &self.dirs[0])), Some((1, &self.dirs[1]))],
                w_angle * ROOT_ANCHOR_WEIGHT,
                grad,
            );
        }
        for i in 0..n.saturating_sub(2) {
            energy += angle_triple(
                [&points[i], &points[i + 1], &points[i + 2]],
                [
                    Some((i, &self.dirs[i])),
                    Some((i + 1, &self.dirs[i + 1])),
                    Some((i + 2, &self.dirs[i + 2])),
                ],
                w_angle,
                grad,
            );
        }
        // Length term
        if let Some(w_length) = tool.length_weight() {
            for i in 0..n.saturating_sub(1) {
                let v: Vec3 = points[i + 1] - points[i];
                energy += w_length * v.norm_squared();
                grad[i] -= w_length * 2.0 * v.dot(self.dirs[i].as_ref());
                grad[i + 1] += w_length * 2.0 * v.dot(self.dirs[i + 1].as_ref());
            }
        }

        energy
    }
}

/// Collinearity penalty `w * (1 - a*b*c)^2` for one point triple, with
/// chain-rule gradients scattered into `grad`.
///
/// `vars` carries `(solution index, ray direction)` for each movable
/// point; `None` marks a fixed point (the root anchor). Degenerate
/// triples with coincident points contribute nothing.
fn angle_triple(
    points: [&Point3; 3],
    vars: [Option<(usize, &Dir3)>; 3],
    weight: f64,
    grad: &mut DVector<f64>,
) -> f64 {
    let v21: Vec3 = points[2] - points[1];
    let v10: Vec3 = points[1] - points[0];
    let len21 = v21.norm();
    let len10 = v10.norm();
    if len21 < 1e-12 || len10 < 1e-12 {
        return 0.0;
    }

    let a = 1.0 / len21;
    let b = 1.0 / len10;
    let c = v21.dot(&v10);
    let tmp = 1.0 - a * b * c;
    let scale = -2.0 * weight * tmp;

    if let Some((j, dir)) = vars[0] {
        let d = dir.as_ref();
        let db = b * b * b * v10.dot(d);
        let dc = -v21.dot(d);
        grad[j] += scale * (a * db * c + a * b * dc);
    }
    if let Some((j, dir)) = vars[1] {
        let d = dir.as_ref();
        let da = a * a * a * v21.dot(d);
        let db = -(b * b * b) * v10.dot(d);
        let dc = v21.dot(d) - v10.dot(d);
        grad[j] += scale * (da * b * c + a * db * c + a * b * dc);
    }
    if let Some((j, dir)) = vars[2] {
        let d = dir.as_ref();
        let da = -(a * a * a) * v21.dot(d);
        let dc = v10.dot(d);
        grad[j] += scale * (da * b * c + a * b * dc);
    }

    weight * tmp * tmp
}
