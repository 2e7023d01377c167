//! Logging facilities for Strata.
//!
//! Strata uses the `tracing` crate for instrumentation. The library never
//! installs a subscriber; to see logs, install one in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("strata=debug,strata_core=debug")
//!         .init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Every event is emitted with an explicit target from [`targets`], so a
//! single subsystem can be enabled with a directive such as
//! `strata::applier=trace`.

/// Span names used throughout Strata for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// Worker job execution span.
    pub const WORKER_JOB: &str = "strata::worker_job";
    /// Diff computation span.
    pub const DIFF: &str = "strata::diff";
    /// View apply span.
    pub const APPLY: &str = "strata::apply";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "strata_core::signal";
    /// Dedicated worker target.
    pub const WORKER: &str = "strata_core::worker";
    /// Diff engine target.
    pub const DIFF: &str = "strata::diff";
    /// Model store target.
    pub const STORE: &str = "strata::store";
    /// Update scheduler target.
    pub const SCHEDULER: &str = "strata::scheduler";
    /// View applier target.
    pub const APPLIER: &str = "strata::applier";
    /// List binding target.
    pub const BINDING: &str = "strata::binding";
}
