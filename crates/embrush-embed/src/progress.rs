//! Injected progress reporting.
//!
//! Per-step diagnostics flow through an explicit sink handed into the
//! embedder and its sub-components rather than a global status channel.
//! Reporting must never alter control flow.

/// Receiver for per-step diagnostics during embedding.
///
/// All methods have empty defaults so implementors pick what they want.
pub trait ProgressSink {
    /// One sphere-tracing step: step index and accumulated distance.
    fn trace_step(&mut self, _step: usize, _accumulated: f64) {}

    /// One solver iteration: iteration index and current objective.
    fn solver_iteration(&mut self, _iteration: usize, _objective: f64) {}
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {}

/// Sink that forwards to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn trace_step(&mut self, step: usize, accumulated: f64) {
        log::debug!("sphere tracing step #{step}: {accumulated}");
    }

    fn solver_iteration(&mut self, iteration: usize, objective: f64) {
        log::debug!("iteration #{iteration}: E = {objective}");
    }
}
