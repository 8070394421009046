//! Error taxonomy shared by the batch reader and the split/merge writer.

use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

use crate::split_merge::SplitMergePhase;

/// Coarse classification of a [`BatchError`], independent of wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A caller-supplied argument was rejected before any I/O happened.
    InvalidArgument,
    /// An input file or a scratch batch file was missing.
    NotFound,
    /// The bytes on disk are not valid columnar data.
    Format,
    /// Generic read, write, rename or delete failure.
    Io,
    /// The filesystem was not in the state required to start.
    Precondition,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotFound => "not found",
            ErrorKind::Format => "format error",
            ErrorKind::Io => "io error",
            ErrorKind::Precondition => "precondition failed",
        };
        f.write_str(name)
    }
}

/// Error type returned by every public operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Non-positive batch size, empty file names and similar caller mistakes.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The referenced file does not exist.
    #[error("file not found: {}", .path.display())]
    NotFound {
        /// Path that could not be opened.
        path: PathBuf,
    },
    /// Parquet decoding failed while reading a file.
    #[error("malformed parquet data in {}: {source}", .path.display())]
    Format {
        /// File being decoded.
        path: PathBuf,
        /// Underlying decoder error.
        source: ParquetError,
    },
    /// Parquet encoding failed while persisting a table.
    #[error("parquet write to {} failed: {source}", .path.display())]
    Write {
        /// Destination of the failed write.
        path: PathBuf,
        /// Underlying encoder error.
        source: ParquetError,
    },
    /// Arrow kernel failure (concatenation, batch assembly).
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
    /// Filesystem failure other than a missing file.
    #[error("io error at {}: {source}", .path.display())]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying OS error.
        source: io::Error,
    },
    /// The scratch directory already held files on entry.
    #[error(
        "scratch directory {} is not empty ({entries} entries); remove it before retrying",
        .dir.display()
    )]
    ScratchNotEmpty {
        /// Scratch directory that was found dirty.
        dir: PathBuf,
        /// Number of entries found.
        entries: usize,
    },
    /// A split/merge invocation failed; carries the phase it failed in.
    #[error("split/merge failed while {phase}: {source}")]
    Phase {
        /// Phase that was active when the error surfaced.
        phase: SplitMergePhase,
        /// Error raised by that phase.
        source: Box<BatchError>,
    },
}

impl BatchError {
    /// Map an OS error for `path`, promoting `NotFound` to its own variant.
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            BatchError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            BatchError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Map a decoder error for `path`.
    ///
    /// OS failures surfaced through the decoder (reading a directory, a
    /// revoked permission) keep their I/O classification; a short read stays
    /// a format problem since it means the file is truncated.
    pub(crate) fn format(path: &Path, source: ParquetError) -> Self {
        let source = match source {
            ParquetError::External(inner) => match inner.downcast::<io::Error>() {
                Ok(err) if err.kind() != io::ErrorKind::UnexpectedEof => {
                    return BatchError::io(path, *err)
                }
                Ok(err) => ParquetError::External(err),
                Err(inner) => ParquetError::External(inner),
            },
            other => other,
        };
        BatchError::Format {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: ParquetError) -> Self {
        BatchError::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Classify this error, looking through [`BatchError::Phase`] wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BatchError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            BatchError::NotFound { .. } => ErrorKind::NotFound,
            BatchError::Format { .. } => ErrorKind::Format,
            BatchError::Write { .. } | BatchError::Io { .. } => ErrorKind::Io,
            BatchError::Arrow(_) => ErrorKind::Format,
            BatchError::ScratchNotEmpty { .. } => ErrorKind::Precondition,
            BatchError::Phase { source, .. } => source.kind(),
        }
    }

    /// Phase of the split/merge invocation that failed, if any.
    pub fn phase(&self) -> Option<SplitMergePhase> {
        match self {
            BatchError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = BatchError::io(
            Path::new("missing.parquet"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(err, BatchError::NotFound { .. }));
    }

    #[test]
    fn permission_failure_stays_io() {
        let err = BatchError::io(
            Path::new("locked.parquet"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn decoder_io_failures_keep_io_kind() {
        let path = Path::new("dir");
        let wrapped = ParquetError::External(Box::new(io::Error::from(
            io::ErrorKind::PermissionDenied,
        )));
        assert_eq!(BatchError::format(path, wrapped).kind(), ErrorKind::Io);

        let truncated = ParquetError::External(Box::new(io::Error::from(
            io::ErrorKind::UnexpectedEof,
        )));
        assert_eq!(BatchError::format(path, truncated).kind(), ErrorKind::Format);

        let corrupt = ParquetError::General("Invalid Parquet file. Corrupt footer".into());
        assert_eq!(BatchError::format(path, corrupt).kind(), ErrorKind::Format);
    }

    #[test]
    fn phase_wrapper_reports_inner_kind() {
        let err = BatchError::Phase {
            phase: SplitMergePhase::Merging,
            source: Box::new(BatchError::NotFound {
                path: PathBuf::from("temp_batch_1.parquet"),
            }),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.phase(), Some(SplitMergePhase::Merging));
        assert!(err.to_string().contains("merging"));
    }
}
