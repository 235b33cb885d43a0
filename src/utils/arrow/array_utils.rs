//! Utilities for working with Arrow arrays and record batches.
//!
//! Every pipeline stage treats a `RecordBatch` as an immutable table value;
//! these helpers build the next value from the previous one.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef};
use arrow::datatypes::{Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::{PipelineError, Result};

/// Downcast a column to a specific array type with clear error messages
///
/// # Type Parameters
///
/// * `A` - The target array type to downcast to
pub fn downcast_array<'a, A: Array + 'static>(
    array: &'a ArrayRef,
    column_name: &str,
    expected_type_name: &str,
) -> Result<&'a A> {
    array
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| PipelineError::InvalidDataType {
            column: column_name.to_string(),
            expected: expected_type_name.to_string(),
        })
}

/// Get the column index by name from a record batch
pub fn get_column_index(batch: &RecordBatch, column_name: &str) -> Result<usize> {
    batch
        .schema()
        .index_of(column_name)
        .map_err(|_| PipelineError::column_not_found(column_name))
}

/// Get a column from a record batch by name
pub fn get_column_by_name(batch: &RecordBatch, column_name: &str) -> Result<ArrayRef> {
    let idx = get_column_index(batch, column_name)?;
    Ok(batch.column(idx).clone())
}

/// Project a batch onto the named columns, in the given order
pub fn select_columns<S: AsRef<str>>(batch: &RecordBatch, columns: &[S]) -> Result<RecordBatch> {
    let indices = columns
        .iter()
        .map(|c| get_column_index(batch, c.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(batch.project(&indices)?)
}

/// Drop the named columns; names that are not present are ignored
pub fn drop_columns<S: AsRef<str>>(batch: &RecordBatch, columns: &[S]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !columns.iter().any(|c| c.as_ref() == f.name()))
        .map(|(i, _)| i)
        .collect();
    Ok(batch.project(&keep)?)
}

/// Rename every column through `rename`, keeping data and metadata
pub fn rename_columns<F>(batch: &RecordBatch, rename: F) -> Result<RecordBatch>
where
    F: Fn(&str) -> String,
{
    let schema = batch.schema();
    let fields: Vec<FieldRef> = schema
        .fields()
        .iter()
        .map(|f| Arc::new(f.as_ref().clone().with_name(rename(f.name()))))
        .collect();
    let renamed = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(renamed), batch.columns().to_vec())?)
}

/// Replace the named column with a new array (and its type), keeping the position
pub fn replace_column(batch: &RecordBatch, column_name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let idx = get_column_index(batch, column_name)?;
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    fields[idx] = Arc::new(Field::new(column_name, array.data_type().clone(), true));

    let mut columns = batch.columns().to_vec();
    columns[idx] = array;

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// Append new columns at the end of a batch
pub fn append_columns(batch: &RecordBatch, new_columns: Vec<(Field, ArrayRef)>) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns = batch.columns().to_vec();
    for (field, array) in new_columns {
        fields.push(Arc::new(field));
        columns.push(array);
    }
    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// Null count per column, largest first (ties keep column order)
#[must_use]
pub fn null_counts(batch: &RecordBatch) -> Vec<(String, usize)> {
    let schema = batch.schema();
    let mut counts: Vec<(String, usize)> = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(f, c)| (f.name().clone(), c.logical_null_count()))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::DataType;

    fn sample() -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            ("A Col", Arc::new(StringArray::from(vec![Some("x"), None])) as ArrayRef),
            ("B Col", Arc::new(Int64Array::from(vec![None, None])) as ArrayRef),
            ("C", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
        ])
        .unwrap()
    }

    #[test]
    fn test_select_missing_column_fails() {
        let err = select_columns(&sample(), &["A Col", "Nope"]).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound { column } if column == "Nope"));
    }

    #[test]
    fn test_select_reorders() {
        let out = select_columns(&sample(), &["C", "A Col"]).unwrap();
        assert_eq!(out.schema().field(0).name(), "C");
        assert_eq!(out.num_columns(), 2);
    }

    #[test]
    fn test_rename_and_drop() {
        let renamed = rename_columns(&sample(), |n| n.to_lowercase()).unwrap();
        let dropped = drop_columns(&renamed, &["b col"]).unwrap();
        let names: Vec<_> = dropped.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["a col", "c"]);
    }

    #[test]
    fn test_replace_column_changes_type() {
        let replacement: ArrayRef = Arc::new(StringArray::from(vec!["1", "2"]));
        let out = replace_column(&sample(), "C", replacement).unwrap();
        assert_eq!(out.schema().field(2).data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_null_counts_sorted() {
        let counts = null_counts(&sample());
        assert_eq!(counts[0], ("B Col".to_string(), 2));
        assert_eq!(counts[1], ("A Col".to_string(), 1));
        assert_eq!(counts[2], ("C".to_string(), 0));
    }
}
