//! Limited-memory BFGS minimization.
//!
//! Quasi-Newton descent with the standard two-loop recursion over a
//! short history of `(s, y)` curvature pairs, and a backtracking Armijo
//! line search. Only strictly non-worsening steps are ever accepted, so
//! the objective at the returned point is never above the objective at
//! the start point regardless of status.

use nalgebra::DVector;
use std::collections::VecDeque;

use crate::progress::ProgressSink;

/// A differentiable objective over `R^n`.
pub trait Objective {
    /// Evaluate the objective at `x`, writing the gradient into `grad`.
    ///
    /// `grad` arrives zeroed and has the same length as `x`.
    fn evaluate(&self, x: &DVector<f64>, grad: &mut DVector<f64>) -> f64;
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SolverStatus {
    /// Gradient norm fell below the stopping tolerance.
    Converged,
    /// Iteration cap reached before convergence.
    MaxIterations,
    /// The line search could not find a decreasing step.
    LineSearchFailed,
}

/// Solver configuration.
#[derive(Debug, Clone, Copy)]
pub struct LbfgsParams {
    /// Number of curvature pairs kept for the two-loop recursion.
    pub history: usize,
    /// Stopping tolerance on `||g|| / max(1, ||x||)`.
    pub epsilon: f64,
    /// Hard iteration cap.
    pub max_iterations: usize,
    /// Armijo sufficient-decrease constant.
    pub c1: f64,
    /// Maximum backtracking halvings per line search.
    pub max_line_search: usize,
}

impl Default for LbfgsParams {
    fn default() -> Self {
        Self {
            history: 6,
            epsilon: 1e-4,
            max_iterations: 500,
            c1: 1e-4,
            max_line_search: 40,
        }
    }
}

/// Result of a minimization run.
#[derive(Debug, Clone)]
pub struct LbfgsOutcome {
    /// Best-found variables (always returned, even on failure).
    pub x: DVector<f64>,
    /// Objective value at `x`.
    pub objective: f64,
    /// Number of completed iterations.
    pub iterations: usize,
    /// Termination status.
    pub status: SolverStatus,
}

/// Minimize `objective` starting from `x0`.
pub fn minimize(
    objective: &dyn Objective,
    x0: DVector<f64>,
    params: &LbfgsParams,
    sink: &mut dyn ProgressSink,
) -> LbfgsOutcome {
    let n = x0.len();
    let mut x = x0;
    let mut g = DVector::zeros(n);
    let mut fx = objective.evaluate(&x, &mut g);

    if converged(&x, &g, params.epsilon) {
        return LbfgsOutcome {
            x,
            objective: fx,
            iterations: 0,
            status: SolverStatus::Converged,
        };
    }

    // (s, y, rho) curvature pairs, oldest first
    let mut pairs: VecDeque<(DVector<f64>, DVector<f64>, f64)> =
        VecDeque::with_capacity(params.history);

    for k in 1..=params.max_iterations {
        let mut d = search_direction(&g, &pairs);

        // Fall back to steepest descent if curvature info is unusable
        let mut dg = g.dot(&d);
        if dg >= 0.0 {
            d = -&g;
            dg = -g.norm_squared();
            pairs.clear();
        }

        // Backtracking Armijo line search
        let mut alpha = if k == 1 { (1.0 / d.norm()).min(1.0) } else { 1.0 };
        let mut accepted = None;
        let mut gt = DVector::zeros(n);
        for _ in 0..params.max_line_search {
            let xt = &x + alpha * &d;
            gt.fill(0.0);
            let ft = objective.evaluate(&xt, &mut gt);
            if ft.is_finite() && ft <= fx + params.c1 * alpha * dg {
                accepted = Some((xt, ft));
                break;
            }
            alpha *= 0.5;
        }

        let (xt, ft) = match accepted {
            Some(step) => step,
            None => {
                return LbfgsOutcome {
                    x,
                    objective: fx,
                    iterations: k - 1,
                    status: SolverStatus::LineSearchFailed,
                };
            }
        };

        let s = &xt - &x;
        let y = &gt - &g;
        let sy = s.dot(&y);
        // Skip pairs that would break positive curvature
        if sy > 1e-10 {
            if pairs.len() == params.history {
                pairs.pop_front();
            }
            let rho = 1.0 / sy;
            pairs.push_back((s, y, rho));
        }

        x = xt;
        fx = ft;
        g.copy_from(&gt);

        sink.solver_iteration(k, fx);

        if converged(&x, &g, params.epsilon) {
            return LbfgsOutcome {
                x,
                objective: fx,
                iterations: k,
                status: SolverStatus::Converged,
            };
        }
    }

    LbfgsOutcome {
        x,
        objective: fx,
        iterations: params.max_iterations,
        status: SolverStatus::MaxIterations,
    }
}

fn converged(x: &DVector<f64>, g: &DVector<f64>, epsilon: f64) -> bool {
    g.norm() / x.norm().max(1.0) < epsilon
}

/// Two-loop recursion: approximate `-H * g` from the curvature pairs.
fn search_direction(
    g: &DVector<f64>,
    pairs: &VecDeque<(DVector<f64>, DVector<f64>, f64)>,
) -> DVector<f64> {
    let mut d = -g;

    if pairs.is_empty() {
        return d;
    }

    let mut alphas = Vec::with_capacity(pairs.len());
    for (s, y, rho) in pairs.iter().rev() {
        let alpha = rho * s.dot(&d);
        d.axpy(-alpha, y, 1.0);
        alphas.push(alpha);
    }

    // Initial Hessian scaling from the most recent pair
    if let Some((s, y, _)) = pairs.back() {
        d *= s.dot(y) / y.dot(y);
    }

    for ((s, y, rho), alpha) in pairs.iter().zip(alphas.iter().rev()) {
        let beta = rho * y.dot(&d);
        d.axpy(alpha - beta, s, 1.0);
    }

    d
}
