//! Stroke embedding orchestration.
//!
//! Runs the full pipeline for one finished stroke: cast a ray per
//! raster point, seed ray parameters by sphere tracing (per-tool
//! policy), refine them with the L-BFGS energy minimization, and
//! reconstruct the final 3D polyline. Everything runs synchronously on
//! the calling thread; the proxy index is only read.

use std::time::Instant;

use embrush_math::{lerp, Dir3, Point2, Point3, Vec3};
use embrush_mesh::SpatialIndex;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraFrame, Ray, Viewport};
use crate::energy::StrokeEnergy;
use crate::error::{EmbedError, Result};
use crate::progress::ProgressSink;
use crate::solver::{self, LbfgsParams, SolverStatus};
use crate::tool::{Tool, ToolConfig};
use crate::trace::SphereTracer;

/// Distance from the first stroke point to its synthetic root anchor.
const ROOT_ANCHOR_OFFSET: f64 = 0.1;

/// Everything one embedding call needs, passed by value/reference.
///
/// No component reaches into view-layer state: the camera is a
/// snapshot, the tool configuration is plain data, and the index is a
/// shared read-only handle.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddingContext<'a> {
    /// Closest-point index over the proxy mesh.
    pub index: &'a SpatialIndex,
    /// Camera snapshot for this stroke.
    pub camera: CameraFrame,
    /// Canvas dimensions the raster points were sampled in.
    pub viewport: Viewport,
    /// Tool selection and offset levels.
    pub config: ToolConfig,
}

/// Timing and solver metadata attached to a successful embedding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmbedDiagnostics {
    /// Wall-clock time of the whole embedding in seconds.
    pub elapsed_seconds: f64,
    /// Number of L-BFGS iterations performed.
    pub solver_iterations: usize,
    /// How the solver terminated. Non-convergence is a warning, not a
    /// failure: the best-found parameters are used regardless.
    pub solver_status: SolverStatus,
}

impl EmbedDiagnostics {
    /// One-line summary suitable for a status bar.
    pub fn status_line(&self) -> String {
        format!(
            "stroke embedding completed in {:.1} seconds ({} iterations, {:?})",
            self.elapsed_seconds, self.solver_iterations, self.solver_status
        )
    }
}

/// A stroke embedded onto the proxy surface.
#[derive(Debug, Clone)]
pub struct EmbeddedStroke {
    /// Final 3D points, one per input raster point, order preserved.
    pub points: Vec<Point3>,
    /// Root anchor, present for rooted tools only.
    pub root_anchor: Option<Point3>,
    /// Timing and solver metadata.
    pub diagnostics: EmbedDiagnostics,
}

/// Seed state produced by the per-tool initialization.
struct InitialGuess {
    dists: Vec<f64>,
    root_anchor: Option<Point3>,
}

/// Embed an ordered 2D stroke onto the proxy surface.
///
/// Requires at least two raster points. For rooted tools a stroke whose
/// first ray never reaches the surface within the far clip is rejected
/// with [`EmbedError::SurfaceMiss`]; the caller discards the stroke and
/// the session continues.
pub fn embed(
    ctx: &EmbeddingContext<'_>,
    raster_points: &[Point2],
    sink: &mut dyn ProgressSink,
) -> Result<EmbeddedStroke> {
    if raster_points.len() < 2 {
        return Err(EmbedError::TooFewPoints(raster_points.len()));
    }

    let start = Instant::now();

    log::debug!("computing rays for {} stroke points", raster_points.len());
    let dirs: Vec<Dir3> = raster_points
        .iter()
        .map(|p| ctx.camera.cast_ray(p, &ctx.viewport).direction)
        .collect();

    let guess = initial_guess(ctx, &dirs, sink)?;

    log::debug!("optimizing stroke with {} parameters", dirs.len());
    let energy = StrokeEnergy::new(
        ctx.index,
        ctx.camera.position,
        &dirs,
        ctx.config,
        guess.root_anchor,
    );
    let outcome = solver::minimize(
        &energy,
        DVector::from_vec(guess.dists),
        &LbfgsParams::default(),
        sink,
    );
    if outcome.status != SolverStatus::Converged {
        log::warn!("solver finished without convergence: {:?}", outcome.status);
    }

    let points: Vec<Point3> = dirs
        .iter()
        .zip(outcome.x.iter())
        .map(|(d, &t)| ctx.camera.position + t * d.as_ref())
        .collect();

    let diagnostics = EmbedDiagnostics {
        elapsed_seconds: start.elapsed().as_secs_f64(),
        solver_iterations: outcome.iterations,
        solver_status: outcome.status,
    };
    log::info!("{}", diagnostics.status_line());

    Ok(EmbeddedStroke {
        points,
        root_anchor: guess.root_anchor,
        diagnostics,
    })
}

/// Seed the ray parameters by sphere tracing, per tool policy.
fn initial_guess(
    ctx: &EmbeddingContext<'_>,
    dirs: &[Dir3],
    sink: &mut dyn ProgressSink,
) -> Result<InitialGuess> {
    let tracer = SphereTracer::new(ctx.index, ctx.camera.far);
    let origin = ctx.camera.position;
    let ray = |d: &Dir3| Ray {
        origin,
        direction: *d,
    };
    let n = dirs.len();

    match ctx.config.tool {
        // Every point traced independently; misses are kept as-is.
        Tool::Level => {
            let dists = dirs
                .iter()
                .map(|d| tracer.trace(&ray(d), ctx.config.level, sink).distance)
                .collect();
            Ok(InitialGuess {
                dists,
                root_anchor: None,
            })
        }

        // Endpoints traced, interior lerped, root anchored behind the
        // first point.
        Tool::Hair | Tool::Feather => {
            let first = tracer.trace(&ray(&dirs[0]), ctx.config.level, sink);
            if !first.hit() {
                log::debug!("anchor ray missed the proxy surface, rejecting stroke");
                return Err(EmbedError::SurfaceMiss);
            }

            let last = tracer.trace(&ray(&dirs[n - 1]), ctx.config.level_offset, sink);
            let last_dist = if last.hit() {
                last.distance
            } else {
                first.distance
            };

            let p1 = origin + first.distance * dirs[0].as_ref();
            let root_anchor = match ctx.config.tool {
                Tool::Hair => p1 - first.normal.as_ref() * ROOT_ANCHOR_OFFSET,
                Tool::Feather => {
                    let p2 = origin + first.distance * dirs[n - 1].as_ref();
                    let nrm = first.normal.as_ref();
                    let tangent: Vec3 = p2.coords - p2.coords.dot(nrm) * nrm;
                    p1 - tangent.normalize() * ROOT_ANCHOR_OFFSET
                }
                Tool::Level => unreachable!("level tool has no root anchor"),
            };

            let dists = (0..n)
                .map(|i| lerp(first.distance, last_dist, i as f64 / (n - 1) as f64))
                .collect();
            Ok(InitialGuess {
                dists,
                root_anchor: Some(root_anchor),
            })
        }
    }
}

/// Subdivide an embedded polyline, inserting linearly interpolated
/// points into any segment longer than `spacing`. Input points and
/// their ordering are preserved.
pub fn resample_by_spacing(points: &[Point3], spacing: f64) -> Vec<Point3> {
    let mut out = Vec::with_capacity(points.len());
    let Some(first) = points.first() else {
        return out;
    };
    out.push(*first);

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dist = (b - a).norm();
        if dist > spacing {
            let div = (dist / spacing).ceil() as usize;
            let step = 1.0 / (div as f64 + 1.0);
            for l in 1..div {
                let t = step * l as f64;
                out.push(a + (b - a) * t);
            }
        }
        out.push(b);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::downward_camera;
    use crate::progress::NullSink;
    use approx::assert_relative_eq;
    use embrush_mesh::test_meshes::flat_plane;

    fn level_context<'a>(index: &'a SpatialIndex, level: f64) -> EmbeddingContext<'a> {
        EmbeddingContext {
            index,
            camera: downward_camera(100.0, 1000.0),
            viewport: Viewport {
                width: 100,
                height: 100,
            },
            config: ToolConfig {
                tool: Tool::Level,
                level,
                level_offset: 0.0,
            },
        }
    }

    #[test]
    fn test_level_stroke_lands_on_offset_plane() {
        let mesh = flat_plane(200.0);
        let index = SpatialIndex::build(&mesh).unwrap();
        let ctx = level_context(&index, 5.0);

        let raster = vec![
            Point2::new(50.0, 40.0),
            Point2::new(50.0, 50.0),
            Point2::new(50.0, 60.0),
        ];
        let stroke = embed(&ctx, &raster, &mut NullSink).unwrap();

        assert_eq!(stroke.points.len(), 3);
        assert!(stroke.root_anchor.is_none());
        for p in &stroke.points {
            assert_relative_eq!(p.y, 5.0, epsilon = 1e-2);
        }
        // Raster order maps to world order: y=40 looks toward +z here
        assert!(stroke.points[0].z > stroke.points[1].z);
        assert!(stroke.points[1].z > stroke.points[2].z);
    }

    #[test]
    fn test_optimal_input_stays_put() {
        // Seed exactly on the offset surface, evenly spaced and
        // collinear: the solver should accept the input as-is.
        let mesh = flat_plane(200.0);
        let index = SpatialIndex::build(&mesh).unwrap();
        let ctx = level_context(&index, 5.0);
        let vp = ctx.viewport;

        let raster = vec![
            Point2::new(50.0, 40.0),
            Point2::new(50.0, 50.0),
            Point2::new(50.0, 60.0),
        ];
        let dirs: Vec<Dir3> = raster
            .iter()
            .map(|p| ctx.camera.cast_ray(p, &vp).direction)
            .collect();
        // Exact ray-plane intersection with the y = 5 offset plane
        let exact: Vec<f64> = dirs.iter().map(|d| 95.0 / -d.y).collect();

        let energy = StrokeEnergy::new(&index, ctx.camera.position, &dirs, ctx.config, None);
        let outcome = solver::minimize(
            &energy,
            DVector::from_vec(exact.clone()),
            &LbfgsParams::default(),
            &mut NullSink,
        );

        assert!(outcome.objective < 1e-10);
        for (got, want) in outcome.x.iter().zip(&exact) {
            assert!((got - want).abs() < 1e-3);
        }
    }

    #[test]
    fn test_hair_stroke_embeds_with_anchor() {
        let mesh = flat_plane(200.0);
        let index = SpatialIndex::build(&mesh).unwrap();
        let ctx = EmbeddingContext {
            config: ToolConfig {
                tool: Tool::Hair,
                level: 0.0,
                level_offset: 3.0,
            },
            ..level_context(&index, 0.0)
        };

        let raster = vec![
            Point2::new(50.0, 50.0),
            Point2::new(52.0, 52.0),
            Point2::new(54.0, 54.0),
            Point2::new(56.0, 56.0),
        ];
        let stroke = embed(&ctx, &raster, &mut NullSink).unwrap();

        assert_eq!(stroke.points.len(), 4);
        let anchor = stroke.root_anchor.expect("hair strokes are rooted");
        // Anchor sits behind the surface along the plane normal
        assert_relative_eq!(anchor.y, -0.1, epsilon = 1e-2);
        // Endpoints near their target offsets
        assert!(stroke.points[0].y.abs() < 0.1);
        assert!((stroke.points[3].y - 3.0).abs() < 0.5);
    }

    #[test]
    fn test_hair_stroke_away_from_mesh_is_rejected() {
        let mesh = flat_plane(200.0);
        let index = SpatialIndex::build(&mesh).unwrap();
        let mut camera = downward_camera(100.0, 1000.0);
        // Flip the camera to look straight up, away from the plane
        camera.w = -camera.w;
        camera.v = -camera.v;
        let ctx = EmbeddingContext {
            index: &index,
            camera,
            viewport: Viewport {
                width: 100,
                height: 100,
            },
            config: ToolConfig {
                tool: Tool::Hair,
                level: 0.0,
                level_offset: 3.0,
            },
        };

        let raster = vec![Point2::new(50.0, 50.0), Point2::new(60.0, 60.0)];
        let err = embed(&ctx, &raster, &mut NullSink).unwrap_err();
        assert!(matches!(err, EmbedError::SurfaceMiss));
    }

    #[test]
    fn test_too_few_points_rejected() {
        let mesh = flat_plane(200.0);
        let index = SpatialIndex::build(&mesh).unwrap();
        let ctx = level_context(&index, 5.0);

        let err = embed(&ctx, &[Point2::new(50.0, 50.0)], &mut NullSink).unwrap_err();
        assert!(matches!(err, EmbedError::TooFewPoints(1)));
    }

    #[test]
    fn test_order_and_count_preserved() {
        let mesh = flat_plane(200.0);
        let index = SpatialIndex::build(&mesh).unwrap();
        let ctx = level_context(&index, 2.0);

        let raster: Vec<Point2> = (0..9)
            .map(|i| Point2::new(30.0 + 5.0 * i as f64, 50.0))
            .collect();
        let stroke = embed(&ctx, &raster, &mut NullSink).unwrap();

        assert_eq!(stroke.points.len(), raster.len());
        // Raster x increases left to right, so world x does too
        for pair in stroke.points.windows(2) {
            assert!(pair[0].x < pair[1].x);
        }
    }

    #[test]
    fn test_resample_by_spacing() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(10.0, 1.0, 0.0),
        ];
        let out = resample_by_spacing(&points, 3.0);
        // First segment subdivided, short second segment untouched
        assert!(out.len() > 3);
        assert_eq!(out[0], points[0]);
        assert_eq!(*out.last().unwrap(), points[2]);
        // Ordering along x preserved
        for pair in out.windows(2) {
            assert!(pair[0].x <= pair[1].x);
        }
    }

    #[test]
    fn test_status_line_format() {
        let diag = EmbedDiagnostics {
            elapsed_seconds: 1.234,
            solver_iterations: 42,
            solver_status: SolverStatus::Converged,
        };
        let line = diag.status_line();
        assert!(line.contains("1.2 seconds"));
        assert!(line.contains("42 iterations"));
    }
}
