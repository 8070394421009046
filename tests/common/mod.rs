//! Common test utilities for integration tests.
#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{
    array::{BooleanArray, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};
use parquet_batch::progress::{ProgressObserver, ProgressStage, RecordingObserver};

/// Deterministic four-column table with `rows` rows and some nulls.
pub fn sample_table(rows: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("score", DataType::Float64, false),
        Field::new("active", DataType::Boolean, true),
    ]));
    let ids: Vec<i64> = (0..rows as i64).collect();
    let names: Vec<Option<String>> = (0..rows)
        .map(|i| (i % 5 != 0).then(|| format!("user-{i}")))
        .collect();
    let scores: Vec<f64> = (0..rows).map(|i| i as f64 * 0.5).collect();
    let active: Vec<Option<bool>> = (0..rows)
        .map(|i| if i % 7 == 0 { None } else { Some(i % 2 == 0) })
        .collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(names)),
            Arc::new(Float64Array::from(scores)),
            Arc::new(BooleanArray::from(active)),
        ],
    )
    .expect("sample table should be valid")
}

/// Write `table` synchronously with row groups of at most `row_group_rows`.
pub fn write_fixture(path: &Path, table: &RecordBatch, row_group_rows: usize) {
    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_rows)
        .build();
    let file = std::fs::File::create(path).expect("create fixture");
    let mut writer =
        ArrowWriter::try_new(file, table.schema(), Some(props)).expect("fixture writer");
    writer.write(table).expect("write fixture");
    writer.close().expect("close fixture");
}

/// Same rows, same order, same column names and types.
pub fn assert_same_table(actual: &RecordBatch, expected: &RecordBatch) {
    assert_eq!(actual.num_rows(), expected.num_rows(), "row count");
    assert_eq!(actual.num_columns(), expected.num_columns(), "column count");
    for (a, e) in actual
        .schema()
        .fields()
        .iter()
        .zip(expected.schema().fields().iter())
    {
        assert_eq!(a.name(), e.name());
        assert_eq!(a.data_type(), e.data_type());
    }
    for idx in 0..expected.num_columns() {
        assert_eq!(actual.column(idx), expected.column(idx), "column {idx}");
    }
}

/// Sorted file names directly under `dir`.
pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// Scratch directory used by the default fixed namespace.
pub fn fixed_scratch(output: &Path) -> PathBuf {
    output.join(parquet_batch::scratch::SCRATCH_DIR_NAME)
}

/// Recording observer that also runs `hook` after every per-batch log.
pub struct HookObserver<F> {
    pub recorded: RecordingObserver,
    hook: F,
}

impl<F> HookObserver<F>
where
    F: Fn(usize) + Send + Sync,
{
    pub fn new(hook: F) -> Self {
        Self {
            recorded: RecordingObserver::new(),
            hook,
        }
    }
}

impl<F> ProgressObserver for HookObserver<F>
where
    F: Fn(usize) + Send + Sync,
{
    fn on_start(&self, stage: ProgressStage, total: u64) {
        self.recorded.on_start(stage, total);
    }

    fn on_progress(&self, done: u64, total: u64) {
        self.recorded.on_progress(done, total);
    }

    fn on_batch_log(&self, index: usize, detail: &str) {
        self.recorded.on_batch_log(index, detail);
        (self.hook)(index);
    }
}
