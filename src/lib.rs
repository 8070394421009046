#![deny(missing_docs)]
//! Batched parquet I/O for tables that are uncomfortable to handle in one go.
//!
//! Two independent utilities share one on-disk format and one batch-sizing
//! convention:
//!
//! - [`reader::read_in_batches`] reads a parquet file in fixed-size row
//!   batches while reporting progress, then concatenates them.
//! - [`split_merge::split_merge`] writes an in-memory table as per-batch
//!   files in a scratch directory, merges them into one final file and
//!   removes the scratch directory.
//!
//! Progress goes to an injected [`progress::ProgressObserver`]; structured
//! logs go to `tracing` under the `parquet_batch` target.

mod observability;

/// Error taxonomy.
pub mod error;

/// Row-range planning.
pub mod batching;

/// Progress observers.
pub mod progress;

/// Arrow table helpers.
pub mod table;

/// Parquet file writer.
pub mod writer;

/// Batch reader.
pub mod reader;

/// Scratch directory lifecycle.
pub mod scratch;

/// Split, persist and merge.
pub mod split_merge;

/// Convenience re-exports.
pub mod prelude;

pub use crate::{
    error::{BatchError, ErrorKind},
    reader::{read_all, read_in_batches, BatchReader, BatchStream},
    split_merge::{split_merge, split_merge_to_path, SplitMergeOptions, SplitMergeReport},
    table::Table,
};
