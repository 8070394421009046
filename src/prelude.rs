//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```rust,ignore
//! use parquet_batch::prelude::*;
//!
//! let table = read_in_batches("input.parquet", 100_000, &TracingObserver).await?;
//! let options = SplitMergeOptions::new(100_000).with_final_name("merged.parquet");
//! let report = split_merge(&table, "out", &options, &TracingObserver).await?;
//! ```

pub use crate::{
    error::{BatchError, ErrorKind},
    progress::{NoopObserver, ProgressObserver, ProgressStage, TracingObserver},
    reader::{read_all, read_in_batches, BatchReader},
    scratch::ScratchNamespace,
    split_merge::{split_merge, FailurePolicy, SplitMergeOptions, SplitMergeReport},
    table::Table,
};
