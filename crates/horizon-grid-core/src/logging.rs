//! Logging conventions for Horizon Grid.
//!
//! Horizon Grid uses the `tracing` crate for instrumentation and never
//! installs a subscriber itself. To see logs, install one in the
//! application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_grid::communicator=debug")
//!         .init();
//! }
//! ```
//!
//! Every subsystem logs under one of the [`targets`], so filters can be
//! scoped to, for example, only the selection model.

/// Span names used throughout Horizon Grid for tracing.
pub mod span_names {
    /// One synchronization cycle of a data communicator.
    pub const SYNC_CYCLE: &str = "horizon_grid::sync_cycle";
    /// A full-source fetch backing select-all.
    pub const FETCH_ALL: &str = "horizon_grid::fetch_all";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_grid_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_grid_core::signal";
    /// Item source adapters.
    pub const SOURCE: &str = "horizon_grid::source";
    /// Key mapper.
    pub const KEYS: &str = "horizon_grid::keys";
    /// Viewport tracker.
    pub const VIEWPORT: &str = "horizon_grid::viewport";
    /// Data communicator.
    pub const COMMUNICATOR: &str = "horizon_grid::communicator";
    /// Selection model.
    pub const SELECTION: &str = "horizon_grid::selection";
    /// Grid facade and client entry points.
    pub const GRID: &str = "horizon_grid::grid";
    /// Performance spans.
    pub const PERF: &str = "horizon_grid::perf";
}

/// A guard that keeps a performance span entered until dropped.
///
/// ```
/// use horizon_grid_core::PerfSpan;
///
/// {
///     let _span = PerfSpan::new("expensive_operation");
///     // ... work measured by the subscriber ...
/// }
/// ```
#[must_use = "the span closes as soon as the guard is dropped"]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_grid::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_are_namespaced() {
        for target in [
            targets::SOURCE,
            targets::KEYS,
            targets::VIEWPORT,
            targets::COMMUNICATOR,
            targets::SELECTION,
            targets::GRID,
        ] {
            assert!(target.starts_with("horizon_grid::"));
        }
        assert!(targets::SIGNAL.starts_with(targets::CORE));
    }

    #[test]
    fn test_perf_span() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let _span = PerfSpan::new(span_names::SYNC_CYCLE);
        tracing::info!(target: targets::PERF, "inside span");
    }
}
