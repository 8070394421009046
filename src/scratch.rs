//! Scratch directory owned by one split/merge invocation.

use std::{
    io,
    path::{Path, PathBuf},
};

use ulid::Ulid;

use crate::{
    error::BatchError,
    observability::{log_debug, log_warn},
    writer::PARQUET_EXTENSION,
};

/// Fixed name of the scratch subdirectory inside the output folder.
pub const SCRATCH_DIR_NAME: &str = "temp_batches";

/// How the scratch directory is named for an invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScratchNamespace {
    /// Always `<output_folder>/temp_batches`. The directory must be absent or
    /// empty on entry; concurrent runs against one output folder are not
    /// supported.
    #[default]
    Fixed,
    /// `<output_folder>/temp_batches-<ulid>`, unique per invocation.
    PerInvocation,
}

impl ScratchNamespace {
    fn dir_name(self) -> String {
        match self {
            ScratchNamespace::Fixed => SCRATCH_DIR_NAME.to_string(),
            ScratchNamespace::PerInvocation => format!("{SCRATCH_DIR_NAME}-{}", Ulid::new()),
        }
    }
}

/// Scratch directory plus the batch files recorded in it so far.
#[derive(Debug)]
pub struct ScratchArea {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl ScratchArea {
    /// Create `output_folder` and the scratch directory inside it.
    ///
    /// Fails with [`BatchError::ScratchNotEmpty`] when the scratch directory
    /// already holds entries, leaving them untouched.
    pub async fn prepare(
        output_folder: &Path,
        namespace: ScratchNamespace,
    ) -> Result<Self, BatchError> {
        tokio::fs::create_dir_all(output_folder)
            .await
            .map_err(|err| BatchError::io(output_folder, err))?;
        let dir = output_folder.join(namespace.dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| BatchError::io(&dir, err))?;

        let entries = count_entries(&dir)
            .await
            .map_err(|err| BatchError::io(&dir, err))?;
        if entries > 0 {
            return Err(BatchError::ScratchNotEmpty { dir, entries });
        }

        log_debug!(
            component = "scratch",
            event = "scratch_prepared",
            dir = %dir.display(),
        );
        Ok(Self {
            dir,
            files: Vec::new(),
        })
    }

    /// Scratch directory path.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic path of batch `index` (1-based): `{prefix}{index}.parquet`.
    pub fn batch_path(&self, prefix: &str, index: usize) -> PathBuf {
        self.dir.join(format!("{prefix}{index}.{PARQUET_EXTENSION}"))
    }

    /// Remember a batch file so merge and cleanup can find it.
    pub fn record(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    /// Recorded batch files in creation order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Delete every recorded batch file, then the now-empty directory.
    ///
    /// The first failure is returned as-is; remaining files stay on disk.
    pub async fn cleanup(self) -> Result<(), BatchError> {
        for path in &self.files {
            tokio::fs::remove_file(path)
                .await
                .map_err(|err| BatchError::io(path, err))?;
        }
        tokio::fs::remove_dir(&self.dir)
            .await
            .map_err(|err| BatchError::io(&self.dir, err))?;
        log_debug!(
            component = "scratch",
            event = "scratch_removed",
            dir = %self.dir.display(),
            files = self.files.len(),
        );
        Ok(())
    }

    /// Best-effort removal of everything recorded so far after a failed run.
    ///
    /// Never fails; anything that cannot be removed is logged and left behind.
    /// Returns the number of batch files removed.
    pub async fn compensate(&self) -> usize {
        let mut removed = 0;
        for path in &self.files {
            match tokio::fs::remove_file(path).await {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => log_warn!(
                    component = "scratch",
                    event = "compensation_remove_failed",
                    path = %path.display(),
                    error = %err,
                ),
            }
        }
        if let Err(err) = tokio::fs::remove_dir(&self.dir).await {
            if err.kind() != io::ErrorKind::NotFound {
                log_warn!(
                    component = "scratch",
                    event = "compensation_rmdir_failed",
                    dir = %self.dir.display(),
                    error = %err,
                );
            }
        }
        removed
    }
}

async fn count_entries(dir: &Path) -> io::Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0;
    while entries.next_entry().await?.is_some() {
        count += 1;
    }
    Ok(count)
}
