//! Parquet persistence for whole tables.
//!
//! Every file this crate produces, batch or final, goes through
//! [`write_table`] so the codec and writer settings stay identical.

use std::path::Path;

use parquet::{
    arrow::async_writer::AsyncArrowWriter, basic::Compression,
    file::properties::WriterProperties,
};
use tokio::fs::File;

use crate::{error::BatchError, observability::log_debug, table::Table};

/// Extension used for batch and final files.
pub const PARQUET_EXTENSION: &str = "parquet";

/// Fixed lossless codec applied to every persisted page.
pub const CODEC: Compression = Compression::SNAPPY;

fn writer_properties() -> WriterProperties {
    WriterProperties::builder().set_compression(CODEC).build()
}

/// Write `table` to `path` as a single parquet file, truncating any existing file.
///
/// Returns the size of the file on disk. A zero-row table still produces a
/// valid file carrying the table's schema.
pub async fn write_table(path: &Path, table: &Table) -> Result<u64, BatchError> {
    let file = File::create(path)
        .await
        .map_err(|err| BatchError::io(path, err))?;
    let mut writer = AsyncArrowWriter::try_new(file, table.schema(), Some(writer_properties()))
        .map_err(|err| BatchError::write(path, err))?;
    if table.num_rows() > 0 {
        writer
            .write(table)
            .await
            .map_err(|err| BatchError::write(path, err))?;
    }
    writer
        .close()
        .await
        .map_err(|err| BatchError::write(path, err))?;

    let bytes = tokio::fs::metadata(path)
        .await
        .map_err(|err| BatchError::io(path, err))?
        .len();
    log_debug!(
        component = "writer",
        event = "table_written",
        path = %path.display(),
        rows = table.num_rows(),
        bytes,
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Float64Array, Int32Array},
        datatypes::{DataType, Field, Schema},
    };
    use parquet::file::reader::{FileReader, SerializedFileReader};

    use super::*;

    fn sample(rows: i32) -> Table {
        let schema = Arc::new(Schema::new(vec![
            Field::new("k", DataType::Int32, false),
            Field::new("v", DataType::Float64, true),
        ]));
        Table::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from_iter_values(0..rows)),
                Arc::new(Float64Array::from_iter_values((0..rows).map(f64::from))),
            ],
        )
        .expect("valid batch")
    }

    #[tokio::test]
    async fn written_file_uses_snappy() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("t.parquet");
        let bytes = write_table(&path, &sample(64)).await.expect("write");
        assert!(bytes > 0);

        let reader = SerializedFileReader::new(std::fs::File::open(&path).expect("open"))
            .expect("parquet reader");
        let meta = reader.metadata();
        assert_eq!(meta.file_metadata().num_rows(), 64);
        for rg in meta.row_groups() {
            for column in rg.columns() {
                assert_eq!(column.compression(), Compression::SNAPPY);
            }
        }
    }

    #[tokio::test]
    async fn zero_rows_still_write_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.parquet");
        write_table(&path, &sample(0)).await.expect("write");

        let reader = SerializedFileReader::new(std::fs::File::open(&path).expect("open"))
            .expect("parquet reader");
        assert_eq!(reader.metadata().file_metadata().num_rows(), 0);
        assert_eq!(
            reader.metadata().file_metadata().schema_descr().num_columns(),
            2
        );
    }

    #[tokio::test]
    async fn missing_parent_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nope").join("t.parquet");
        let err = write_table(&path, &sample(1)).await.expect_err("must fail");
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }
}
