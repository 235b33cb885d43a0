//! Left join of the permit table against the statistical extract.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray, UInt32Array};
use arrow::compute::kernels::{cast, take};
use arrow::datatypes::{DataType, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;

use crate::error::{PipelineError, Result};
use crate::utils::arrow::{downcast_array, get_column_by_name};

fn key_strings(batch: &RecordBatch, column: &str) -> Result<ArrayRef> {
    let keys = get_column_by_name(batch, column)?;
    Ok(cast::cast(&keys, &DataType::Utf8)?)
}

/// Left join `left` to `right` on `left_key = right_key`
///
/// Every left row is kept, in order. A left row matching several right rows
/// is repeated once per match; an unmatched row gets nulls in every right
/// column. Null keys never match.
pub fn left_join(
    left: &RecordBatch,
    right: &RecordBatch,
    left_key: &str,
    right_key: &str,
) -> Result<RecordBatch> {
    let left_schema = left.schema();
    let right_schema = right.schema();
    if let Some(field) = right_schema
        .fields()
        .iter()
        .find(|f| left_schema.field_with_name(f.name()).is_ok())
    {
        return Err(PipelineError::Config(format!(
            "join would produce duplicate column '{}'",
            field.name()
        )));
    }

    let right_keys = key_strings(right, right_key)?;
    let right_keys = downcast_array::<StringArray>(&right_keys, right_key, "Utf8")?;
    let mut index: FxHashMap<&str, Vec<u32>> = FxHashMap::default();
    for (row, key) in right_keys.iter().enumerate() {
        if let Some(key) = key {
            let row = u32::try_from(row)
                .map_err(|_| PipelineError::Config("right table too large to join".to_string()))?;
            index.entry(key).or_default().push(row);
        }
    }

    let left_keys = key_strings(left, left_key)?;
    let left_keys = downcast_array::<StringArray>(&left_keys, left_key, "Utf8")?;
    let mut left_rows: Vec<u32> = Vec::with_capacity(left.num_rows());
    let mut right_rows: Vec<Option<u32>> = Vec::with_capacity(left.num_rows());
    for (row, key) in left_keys.iter().enumerate() {
        let row = u32::try_from(row)
            .map_err(|_| PipelineError::Config("left table too large to join".to_string()))?;
        match key.and_then(|k| index.get(k)) {
            Some(matches) => {
                for matched in matches {
                    left_rows.push(row);
                    right_rows.push(Some(*matched));
                }
            }
            None => {
                left_rows.push(row);
                right_rows.push(None);
            }
        }
    }

    let matched = right_rows.iter().filter(|r| r.is_some()).count();
    log::info!(
        "Joined {} of {} rows on {} = {}",
        matched,
        left_rows.len(),
        left_key,
        right_key
    );

    let left_indices = UInt32Array::from(left_rows);
    let right_indices = UInt32Array::from(right_rows);

    let mut fields: Vec<FieldRef> = left_schema.fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(left.num_columns() + right.num_columns());
    for column in left.columns() {
        columns.push(take::take(column.as_ref(), &left_indices, None)?);
    }
    for (field, column) in right_schema.fields().iter().zip(right.columns()) {
        fields.push(Arc::new(field.as_ref().clone().with_nullable(true)));
        columns.push(take::take(column.as_ref(), &right_indices, None)?);
    }

    let schema = Schema::new(fields);
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// Rows of `table` whose `column` is null
#[must_use]
pub fn unmatched_rows(table: &RecordBatch, column: &str) -> usize {
    table
        .schema()
        .index_of(column)
        .map(|i| table.column(i).logical_null_count())
        .unwrap_or(0)
}
