//! Logging infrastructure for batch reads and split/merge runs.
//!
//! Everything is emitted through `tracing` with target `parquet_batch` and an
//! `event` field for filtering. The library never installs a subscriber; the
//! `parquet-batch` binary does.
//!
//! ## Conventions
//!
//! - `event`: snake_case event name (required)
//! - `component`: subsystem (`reader`, `split_merge`, `scratch`, `writer`)
//! - Use `%` for Display, `?` for Debug formatting

/// Target for all crate log events.
pub(crate) const TARGET: &str = "parquet_batch";

/// Macro for info-level log events.
///
/// # Example
/// ```ignore
/// log_info!(
///     component = "reader",
///     event = "read_complete",
///     path = %path.display(),
///     rows = table.num_rows(),
/// );
/// ```
macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::TARGET, $($field)*)
    };
}

/// Macro for debug-level log events.
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::TARGET, $($field)*)
    };
}

/// Macro for warn-level log events.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_info;
pub(crate) use log_warn;
