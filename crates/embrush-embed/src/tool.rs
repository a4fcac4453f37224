//! Embedding tools and per-tool policy.
//!
//! The tool selects which energy terms apply and how the initial guess
//! is built. The policy lives here as methods on [`Tool`] so the
//! initialization and energy code stay free of scattered tool
//! conditionals: pick the tool once at stroke start, thread it through.

use serde::{Deserialize, Serialize};

/// Which embedding tool produced the stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    /// Offset-contour strokes: every point is pulled to the target level.
    Level,
    /// Appendage strokes rooted at the surface, straight along a normal.
    Hair,
    /// Appendage strokes rooted at the surface, lying along the tangent.
    Feather,
}

/// Tool plus the offset levels supplied per embedding call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Selected tool.
    pub tool: Tool,
    /// Target offset distance for the stroke (first point for Hair/Feather).
    pub level: f64,
    /// Target offset distance for the last point (Hair/Feather only).
    pub level_offset: f64,
}

impl Tool {
    /// Weight of the collinearity (angle) term.
    ///
    /// Level strokes trace terrain contours and should not be penalized
    /// for following curvature; Hair/Feather strokes represent rigid-ish
    /// appendages that must stay nearly straight.
    pub fn angle_weight(&self) -> f64 {
        match self {
            Tool::Level => 0.01,
            Tool::Hair | Tool::Feather => 1.0,
        }
    }

    /// Weight of the length regularization term, if active.
    ///
    /// Level points are already tied to the offset surface at every
    /// sample; Hair/Feather points are anchored only at the endpoints
    /// and need regularization against runaway spacing.
    pub fn length_weight(&self) -> Option<f64> {
        match self {
            Tool::Level => None,
            Tool::Hair | Tool::Feather => Some(0.1),
        }
    }

    /// Target level for point `i` of `n` in the level term, or `None`
    /// if the point is excluded from that term.
    pub fn level_target(&self, i: usize, n: usize, config: &ToolConfig) -> Option<f64> {
        match self {
            Tool::Level => Some(config.level),
            Tool::Hair | Tool::Feather => {
                if i == 0 {
                    Some(config.level)
                } else if i == n - 1 {
                    Some(config.level_offset)
                } else {
                    None
                }
            }
        }
    }

    /// Whether this tool anchors the stroke root at a fixed point.
    pub fn has_root_anchor(&self) -> bool {
        matches!(self, Tool::Hair | Tool::Feather)
    }
}
