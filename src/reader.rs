//! Batch-wise parquet reading with progress reporting.
//!
//! [`BatchReader`] opens only the footer, so `total_rows` is known before any
//! data page is touched. [`BatchReader::into_stream`] hands out the lazy batch
//! sequence for callers that need bounded memory; [`read_in_batches`] drains
//! that sequence and concatenates it, which materializes the whole file again.

use std::{
    fmt,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    pin::{pin, Pin},
    task::{Context, Poll},
};

use arrow::datatypes::SchemaRef;
use futures_core::{ready, Stream};
use futures_util::{StreamExt, TryStreamExt};
use parquet::arrow::{
    async_reader::ParquetRecordBatchStream, ParquetRecordBatchStreamBuilder,
};
use pin_project_lite::pin_project;
use tokio::fs::File;

use crate::{
    batching::validate_batch_size,
    error::BatchError,
    observability::{log_debug, log_info},
    progress::{ProgressCounter, ProgressObserver, ProgressStage},
    table::{concat_tables, Table},
};

async fn open_builder(
    path: &Path,
) -> Result<ParquetRecordBatchStreamBuilder<File>, BatchError> {
    let file = File::open(path)
        .await
        .map_err(|err| BatchError::io(path, err))?;
    ParquetRecordBatchStreamBuilder::new(file)
        .await
        .map_err(|err| BatchError::format(path, err))
}

/// Handle on a parquet file whose footer has been read.
pub struct BatchReader {
    path: PathBuf,
    batch_size: NonZeroUsize,
    total_rows: u64,
    schema: SchemaRef,
    builder: ParquetRecordBatchStreamBuilder<File>,
}

impl BatchReader {
    /// Open `path` and load its metadata without reading any rows.
    pub async fn open(path: impl AsRef<Path>, batch_size: usize) -> Result<Self, BatchError> {
        let batch_size = validate_batch_size(batch_size)?;
        let path = path.as_ref().to_path_buf();
        let builder = open_builder(&path).await?;
        let total_rows =
            u64::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or_default();
        let schema = builder.schema().clone();

        log_debug!(
            component = "reader",
            event = "reader_opened",
            path = %path.display(),
            total_rows,
            row_groups = builder.metadata().num_row_groups(),
            batch_size = batch_size.get(),
        );

        Ok(Self {
            path,
            batch_size,
            total_rows,
            schema,
            builder,
        })
    }

    /// Row count recorded in the file footer.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Arrow schema of the file.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Path this reader was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the reader into its lazy, finite, non-restartable batch sequence.
    ///
    /// Every yielded table holds exactly `batch_size` rows except possibly the
    /// last one, regardless of how the file is split into row groups.
    pub fn into_stream(self) -> Result<BatchStream, BatchError> {
        let inner = self
            .builder
            .with_batch_size(self.batch_size.get())
            .build()
            .map_err(|err| BatchError::format(&self.path, err))?;
        Ok(BatchStream {
            inner,
            path: self.path,
            schema: self.schema,
            batch_size: self.batch_size.get(),
            pending: Vec::new(),
            pending_rows: 0,
            exhausted: false,
        })
    }
}

impl fmt::Debug for BatchReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchReader")
            .field("path", &self.path)
            .field("batch_size", &self.batch_size)
            .field("total_rows", &self.total_rows)
            .field("schema_fields", &self.schema.fields().len())
            .finish()
    }
}

pin_project! {
    /// Lazy sequence of row batches in file order.
    ///
    /// Row groups may end mid-batch; the stream carries leftover rows over to
    /// the next batch so batch boundaries only depend on `batch_size`.
    pub struct BatchStream {
        #[pin]
        inner: ParquetRecordBatchStream<File>,
        path: PathBuf,
        schema: SchemaRef,
        batch_size: usize,
        pending: Vec<Table>,
        pending_rows: usize,
        exhausted: bool,
    }
}

impl BatchStream {
    /// Arrow schema shared by every yielded batch.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

/// Split the first `rows` buffered rows off `pending`.
fn take_rows(
    schema: &SchemaRef,
    pending: &mut Vec<Table>,
    pending_rows: &mut usize,
    rows: usize,
) -> Result<Table, BatchError> {
    if pending.len() == 1 && *pending_rows == rows {
        *pending_rows = 0;
        return Ok(pending.remove(0));
    }
    let combined = concat_tables(schema, pending)?;
    pending.clear();
    let rest = combined.num_rows() - rows;
    if rest > 0 {
        pending.push(combined.slice(rows, rest));
    }
    *pending_rows = rest;
    Ok(combined.slice(0, rows))
}

impl Stream for BatchStream {
    type Item = Result<Table, BatchError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if *this.pending_rows >= *this.batch_size {
                let batch_size = *this.batch_size;
                return Poll::Ready(Some(take_rows(
                    this.schema,
                    this.pending,
                    this.pending_rows,
                    batch_size,
                )));
            }
            if *this.exhausted {
                if *this.pending_rows == 0 {
                    return Poll::Ready(None);
                }
                let rows = *this.pending_rows;
                return Poll::Ready(Some(take_rows(
                    this.schema,
                    this.pending,
                    this.pending_rows,
                    rows,
                )));
            }
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(batch)) => {
                    if batch.num_rows() > 0 {
                        *this.pending_rows += batch.num_rows();
                        this.pending.push(batch);
                    }
                }
                Some(Err(err)) => {
                    *this.exhausted = true;
                    this.pending.clear();
                    *this.pending_rows = 0;
                    return Poll::Ready(Some(Err(BatchError::format(this.path, err))));
                }
                None => *this.exhausted = true,
            }
        }
    }
}

/// Read `path` in `batch_size`-row batches, reporting progress, and return
/// the concatenation of all batches in file order.
///
/// Any failure aborts the read and discards the batches gathered so far.
pub async fn read_in_batches(
    path: impl AsRef<Path>,
    batch_size: usize,
    observer: &dyn ProgressObserver,
) -> Result<Table, BatchError> {
    let reader = BatchReader::open(path, batch_size).await?;
    let path = reader.path().to_path_buf();
    let schema = reader.schema().clone();
    let mut progress =
        ProgressCounter::start(observer, ProgressStage::Reading, reader.total_rows());

    let mut fragments = Vec::new();
    let mut stream = pin!(reader.into_stream()?);
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        let index = fragments.len() + 1;
        let rows = fragment.num_rows();
        progress.advance(rows as u64);
        observer.on_batch_log(index, &format!("{rows} rows"));
        fragments.push(fragment);
    }

    let table = concat_tables(&schema, &fragments)?;
    log_info!(
        component = "reader",
        event = "read_complete",
        path = %path.display(),
        batches = fragments.len(),
        rows = progress.done(),
    );
    Ok(table)
}

/// Single-shot read of a whole parquet file.
pub async fn read_all(path: impl AsRef<Path>) -> Result<Table, BatchError> {
    let path = path.as_ref();
    let builder = open_builder(path).await?;
    let schema = builder.schema().clone();
    let batches: Vec<Table> = builder
        .build()
        .map_err(|err| BatchError::format(path, err))?
        .try_collect()
        .await
        .map_err(|err| BatchError::format(path, err))?;
    concat_tables(&schema, &batches)
}
