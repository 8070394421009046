//! In-memory table helpers over Arrow `RecordBatch`.

use arrow::{compute::concat_batches, datatypes::SchemaRef, record_batch::RecordBatch};

use crate::{batching::RowRange, error::BatchError};

/// An ordered set of equally long, named and typed columns.
pub type Table = RecordBatch;

/// Concatenate `parts` in order under `schema`.
///
/// An empty `parts` yields a zero-row table that still carries `schema`.
pub fn concat_tables(schema: &SchemaRef, parts: &[Table]) -> Result<Table, BatchError> {
    if let [only] = parts {
        if only.schema() == *schema {
            return Ok(only.clone());
        }
    }
    Ok(concat_batches(schema, parts)?)
}

/// Zero-copy view of the rows in `range`, keeping column order.
pub fn slice_range(table: &Table, range: RowRange) -> Table {
    table.slice(range.start, range.len())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Int64Array, StringArray},
        datatypes::{DataType, Field, Schema},
    };

    use super::*;

    fn table(ids: Vec<i64>) -> Table {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let names: Vec<Option<String>> = ids.iter().map(|id| Some(format!("n{id}"))).collect();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(StringArray::from(names)),
            ],
        )
        .expect("valid batch")
    }

    #[test]
    fn slice_then_concat_restores_order() {
        let source = table((0..10).collect());
        let parts = vec![
            slice_range(&source, RowRange::new(0, 4)),
            slice_range(&source, RowRange::new(4, 8)),
            slice_range(&source, RowRange::new(8, 10)),
        ];
        assert_eq!(parts[2].num_rows(), 2);

        let merged = concat_tables(&source.schema(), &parts).expect("concat");
        assert_eq!(merged, source);
    }

    #[test]
    fn empty_parts_keep_schema() {
        let source = table(Vec::new());
        let merged = concat_tables(&source.schema(), &[]).expect("concat");
        assert_eq!(merged.num_rows(), 0);
        assert_eq!(merged.schema(), source.schema());
    }
}
