//! Split an in-memory table into batch files, then merge them into one file.
//!
//! One invocation walks
//! `Start -> Splitting -> AllBatchesWritten -> Merging -> Merged -> CleaningUp -> Done`
//! and drops into `Failed` from any phase. Nothing is resumable: a failed run
//! leaves its artifacts on disk (unless [`FailurePolicy::Compensate`] is set)
//! and a retry starts from scratch.
//!
//! The merged table is materialized in memory before the final write, so peak
//! memory still scales with the whole table.

use std::{
    fmt, io,
    num::NonZeroUsize,
    path::{Component, Path, PathBuf},
};

use crate::{
    batching::{batch_count, plan_row_ranges, validate_batch_size},
    error::BatchError,
    observability::{log_debug, log_info, log_warn},
    progress::{ProgressCounter, ProgressObserver, ProgressStage, TracingObserver},
    reader::read_all,
    scratch::{ScratchArea, ScratchNamespace, SCRATCH_DIR_NAME},
    table::{concat_tables, slice_range, Table},
    writer::write_table,
};

/// File name used for the merged output when none is configured.
pub const DEFAULT_FINAL_NAME: &str = "final_merged.parquet";

/// Prefix used for batch files when none is configured.
pub const DEFAULT_SCRATCH_PREFIX: &str = "temp_batch_";

/// Suffix of the file the merged table is staged in before being renamed.
const STAGING_SUFFIX: &str = ".part";

/// Lifecycle of one split/merge invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitMergePhase {
    /// Validating input and preparing the scratch area.
    Start,
    /// Writing batch files.
    Splitting,
    /// Every batch file is on disk.
    AllBatchesWritten,
    /// Reading batch files back and writing the final file.
    Merging,
    /// The final file is in place.
    Merged,
    /// Removing batch files and the scratch directory.
    CleaningUp,
    /// Finished successfully.
    Done,
    /// Terminal failure state.
    Failed,
}

impl fmt::Display for SplitMergePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitMergePhase::Start => "starting",
            SplitMergePhase::Splitting => "splitting",
            SplitMergePhase::AllBatchesWritten => "all batches written",
            SplitMergePhase::Merging => "merging",
            SplitMergePhase::Merged => "merged",
            SplitMergePhase::CleaningUp => "cleaning up",
            SplitMergePhase::Done => "done",
            SplitMergePhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What happens to batch files when splitting or merging fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Leave every artifact on disk for inspection.
    #[default]
    KeepArtifacts,
    /// Delete the batch files written so far, the staged final file and the
    /// scratch directory if it ends up empty.
    Compensate,
}

/// Settings for [`split_merge`].
#[derive(Clone, Debug)]
pub struct SplitMergeOptions {
    batch_size: usize,
    final_name: String,
    scratch_prefix: String,
    scratch_namespace: ScratchNamespace,
    failure_policy: FailurePolicy,
}

impl SplitMergeOptions {
    /// Options with the given batch size and defaults for everything else.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            final_name: DEFAULT_FINAL_NAME.to_string(),
            scratch_prefix: DEFAULT_SCRATCH_PREFIX.to_string(),
            scratch_namespace: ScratchNamespace::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Name of the merged file inside the output folder.
    pub fn with_final_name(mut self, final_name: impl Into<String>) -> Self {
        self.final_name = final_name.into();
        self
    }

    /// Prefix of the per-batch files.
    pub fn with_scratch_prefix(mut self, scratch_prefix: impl Into<String>) -> Self {
        self.scratch_prefix = scratch_prefix.into();
        self
    }

    /// Naming policy of the scratch directory.
    pub fn with_scratch_namespace(mut self, namespace: ScratchNamespace) -> Self {
        self.scratch_namespace = namespace;
        self
    }

    /// Behavior on a split or merge failure.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Rows per batch file.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Merged file name.
    pub fn final_name(&self) -> &str {
        &self.final_name
    }

    /// Batch file prefix.
    pub fn scratch_prefix(&self) -> &str {
        &self.scratch_prefix
    }

    /// Scratch directory naming policy.
    pub fn scratch_namespace(&self) -> ScratchNamespace {
        self.scratch_namespace
    }

    /// Failure policy.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    fn validate(&self) -> Result<NonZeroUsize, BatchError> {
        let batch_size = validate_batch_size(self.batch_size)?;
        let mut components = Path::new(&self.final_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(BatchError::InvalidArgument(format!(
                    "final name {:?} must be a plain file name",
                    self.final_name
                )))
            }
        }
        let per_invocation = format!("{SCRATCH_DIR_NAME}-");
        if self.final_name == SCRATCH_DIR_NAME || self.final_name.starts_with(&per_invocation) {
            return Err(BatchError::InvalidArgument(format!(
                "final name {:?} collides with the scratch directory",
                self.final_name
            )));
        }
        if self.scratch_prefix.contains(std::path::is_separator) {
            return Err(BatchError::InvalidArgument(format!(
                "scratch prefix {:?} must not contain path separators",
                self.scratch_prefix
            )));
        }
        Ok(batch_size)
    }
}

/// Outcome of a successful [`split_merge`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitMergeReport {
    /// Location of the merged file.
    pub final_path: PathBuf,
    /// Number of batch files written and merged.
    pub batch_count: usize,
    /// Rows in the merged file.
    pub total_rows: usize,
    /// Scratch directory used (and removed) by the run.
    pub scratch_dir: PathBuf,
}

/// Split `table` into batch files under `output_folder`, merge them into
/// `output_folder/<final_name>` and remove the scratch area.
///
/// The returned report is only produced when all three phases succeed. Errors
/// raised after validation are wrapped in [`BatchError::Phase`].
pub async fn split_merge(
    table: &Table,
    output_folder: impl AsRef<Path>,
    options: &SplitMergeOptions,
    observer: &dyn ProgressObserver,
) -> Result<SplitMergeReport, BatchError> {
    let batch_size = options.validate()?;
    SplitMergeRun {
        table,
        output_folder: output_folder.as_ref(),
        options,
        batch_size,
        observer,
        phase: SplitMergePhase::Start,
        staging: None,
    }
    .execute()
    .await
}

/// [`split_merge`] with default policies, logging progress through `tracing`,
/// returning only the merged file path.
pub async fn split_merge_to_path(
    table: &Table,
    batch_size: usize,
    output_folder: impl AsRef<Path>,
    final_name: &str,
    scratch_prefix: &str,
) -> Result<PathBuf, BatchError> {
    let options = SplitMergeOptions::new(batch_size)
        .with_final_name(final_name)
        .with_scratch_prefix(scratch_prefix);
    let report = split_merge(table, output_folder, &options, &TracingObserver).await?;
    Ok(report.final_path)
}

struct SplitMergeRun<'a> {
    table: &'a Table,
    output_folder: &'a Path,
    options: &'a SplitMergeOptions,
    batch_size: NonZeroUsize,
    observer: &'a dyn ProgressObserver,
    phase: SplitMergePhase,
    staging: Option<PathBuf>,
}

impl SplitMergeRun<'_> {
    async fn execute(mut self) -> Result<SplitMergeReport, BatchError> {
        let total_rows = self.table.num_rows();
        let batch_count = batch_count(total_rows, self.batch_size);
        log_info!(
            component = "split_merge",
            event = "split_started",
            output = %self.output_folder.display(),
            rows = total_rows,
            batch_size = self.batch_size.get(),
            batch_count,
        );

        let prepared =
            ScratchArea::prepare(self.output_folder, self.options.scratch_namespace()).await;
        let mut scratch = match prepared {
            Ok(scratch) => scratch,
            Err(err) => return Err(self.fail(err)),
        };
        let scratch_dir = scratch.dir().to_path_buf();

        self.enter(SplitMergePhase::Splitting);
        if let Err(err) = self.split(&mut scratch, batch_count).await {
            return Err(self.abort(&scratch, err).await);
        }
        self.enter(SplitMergePhase::AllBatchesWritten);

        self.enter(SplitMergePhase::Merging);
        let final_path = match self.merge(&scratch).await {
            Ok(path) => path,
            Err(err) => return Err(self.abort(&scratch, err).await),
        };
        self.enter(SplitMergePhase::Merged);

        self.enter(SplitMergePhase::CleaningUp);
        if let Err(err) = scratch.cleanup().await {
            return Err(self.fail(err));
        }
        self.enter(SplitMergePhase::Done);

        log_info!(
            component = "split_merge",
            event = "merge_complete",
            final_path = %final_path.display(),
            rows = total_rows,
            batch_count,
        );
        Ok(SplitMergeReport {
            final_path,
            batch_count,
            total_rows,
            scratch_dir,
        })
    }

    async fn split(
        &self,
        scratch: &mut ScratchArea,
        batch_count: usize,
    ) -> Result<(), BatchError> {
        let mut progress =
            ProgressCounter::start(self.observer, ProgressStage::Splitting, batch_count as u64);
        let ranges = plan_row_ranges(self.table.num_rows(), self.batch_size);
        for (offset, range) in ranges.enumerate() {
            let index = offset + 1;
            let path = scratch.batch_path(self.options.scratch_prefix(), index);
            // Recorded before writing so compensation also sees a half-written file.
            scratch.record(path.clone());
            write_table(&path, &slice_range(self.table, range)).await?;

            progress.advance(1);
            self.observer
                .on_batch_log(index, &format!("rows {range} -> {}", path.display()));
        }
        Ok(())
    }

    async fn merge(&mut self, scratch: &ScratchArea) -> Result<PathBuf, BatchError> {
        let files = scratch.files();
        log_info!(
            component = "split_merge",
            event = "merge_started",
            files = files.len(),
        );
        let mut progress =
            ProgressCounter::start(self.observer, ProgressStage::Merging, files.len() as u64);
        let mut parts = Vec::with_capacity(files.len());
        for path in files {
            parts.push(read_all(path).await?);
            progress.advance(1);
        }
        let merged = concat_tables(&self.table.schema(), &parts)?;
        drop(parts);

        let final_name = self.options.final_name();
        let final_path = self.output_folder.join(final_name);
        let staging = self
            .output_folder
            .join(format!("{final_name}{STAGING_SUFFIX}"));
        self.staging = Some(staging.clone());
        write_table(&staging, &merged).await?;
        tokio::fs::rename(&staging, &final_path)
            .await
            .map_err(|err| BatchError::io(&final_path, err))?;
        self.staging = None;
        Ok(final_path)
    }

    fn enter(&mut self, next: SplitMergePhase) {
        log_debug!(
            component = "split_merge",
            event = "phase_transition",
            from = %self.phase,
            to = %next,
        );
        self.phase = next;
    }

    fn fail(&mut self, err: BatchError) -> BatchError {
        let phase = self.phase;
        self.enter(SplitMergePhase::Failed);
        log_warn!(
            component = "split_merge",
            event = "split_merge_failed",
            phase = %phase,
            error = %err,
        );
        BatchError::Phase {
            phase,
            source: Box::new(err),
        }
    }

    async fn abort(&mut self, scratch: &ScratchArea, err: BatchError) -> BatchError {
        let err = self.fail(err);
        if self.options.failure_policy() == FailurePolicy::Compensate {
            let removed = scratch.compensate().await;
            if let Some(staging) = self.staging.take() {
                match tokio::fs::remove_file(&staging).await {
                    Ok(()) => {}
                    // Absent when the failure happened before the staged write.
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => log_warn!(
                        component = "split_merge",
                        event = "compensation_remove_failed",
                        path = %staging.display(),
                        error = %err,
                    ),
                }
            }
            log_warn!(
                component = "split_merge",
                event = "compensated",
                removed_batches = removed,
                dir = %scratch.dir().display(),
            );
        }
        err
    }
}
