//! Command-line entrypoint for batched parquet reads and split/merge rewrites.
//! Runs single-threaded; every step is sequential blocking-style I/O.

use std::path::PathBuf;

use clap::Parser;
use parquet_batch::{
    prelude::*,
    split_merge::{DEFAULT_FINAL_NAME, DEFAULT_SCRATCH_PREFIX},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Batched parquet reader and split/merge writer")]
enum Command {
    /// Read a parquet file in fixed-size batches, reporting progress.
    Read {
        /// Parquet file to read.
        path: PathBuf,
        /// Rows per batch.
        #[arg(long, default_value = "100000")]
        batch_size: usize,
    },
    /// Load a parquet file, then rewrite it through per-batch scratch files.
    SplitMerge {
        /// Parquet file to load.
        input: PathBuf,
        /// Folder receiving the scratch directory and the merged file.
        output_folder: PathBuf,
        /// Rows per batch file (also used when loading the input).
        #[arg(long, default_value = "100000")]
        batch_size: usize,
        /// Name of the merged file.
        #[arg(long, default_value = DEFAULT_FINAL_NAME)]
        final_name: String,
        /// Prefix of the per-batch scratch files.
        #[arg(long, default_value = DEFAULT_SCRATCH_PREFIX)]
        scratch_prefix: String,
        /// Use a scratch directory unique to this run instead of `temp_batches`.
        #[arg(long)]
        unique_scratch: bool,
        /// Delete already written batch files when the run fails.
        #[arg(long)]
        compensate: bool,
    },
}

fn split_merge_options(
    batch_size: usize,
    final_name: String,
    scratch_prefix: String,
    unique_scratch: bool,
    compensate: bool,
) -> SplitMergeOptions {
    let namespace = if unique_scratch {
        ScratchNamespace::PerInvocation
    } else {
        ScratchNamespace::Fixed
    };
    let policy = if compensate {
        FailurePolicy::Compensate
    } else {
        FailurePolicy::KeepArtifacts
    };
    SplitMergeOptions::new(batch_size)
        .with_final_name(final_name)
        .with_scratch_prefix(scratch_prefix)
        .with_scratch_namespace(namespace)
        .with_failure_policy(policy)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,parquet_batch=info")),
        )
        .init();

    match Command::parse() {
        Command::Read { path, batch_size } => {
            let table = read_in_batches(&path, batch_size, &TracingObserver).await?;
            println!(
                "read {} rows x {} columns from {}",
                table.num_rows(),
                table.num_columns(),
                path.display()
            );
        }
        Command::SplitMerge {
            input,
            output_folder,
            batch_size,
            final_name,
            scratch_prefix,
            unique_scratch,
            compensate,
        } => {
            let options = split_merge_options(
                batch_size,
                final_name,
                scratch_prefix,
                unique_scratch,
                compensate,
            );
            let table = read_in_batches(&input, batch_size, &TracingObserver).await?;
            let report = split_merge(&table, &output_folder, &options, &TracingObserver).await?;
            println!(
                "merged {} rows from {} batches into {}",
                report.total_rows,
                report.batch_count,
                report.final_path.display()
            );
        }
    }

    Ok(())
}
