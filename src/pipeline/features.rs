//! Feature deriver: elapsed days between permit workflow milestones.
//!
//! Durations are signed. A milestone recorded before its predecessor gives a
//! negative value, which is kept as-is and surfaced through
//! [`find_negative_durations`].

use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Int64Array};
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;

pub use crate::config::ElapsedTime;
use crate::error::Result;
use crate::utils::arrow::{append_columns, downcast_array, get_column_by_name};

/// A negative elapsed time found in the derived features
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationAnomaly {
    pub row: usize,
    pub column: String,
    pub days: i64,
}

/// Whole days from `from` to `to`; null when either side is null
#[must_use]
pub fn days_between(from: &Date32Array, to: &Date32Array) -> Int64Array {
    from.iter()
        .zip(to.iter())
        .map(|(start, end)| Some(i64::from(end?) - i64::from(start?)))
        .collect()
}

/// Append every elapsed-time feature as a nullable `Int64` column
pub fn derive_elapsed_times(table: &RecordBatch, features: &[ElapsedTime]) -> Result<RecordBatch> {
    let mut new_columns = Vec::with_capacity(features.len());
    for feature in features {
        let from = get_column_by_name(table, &feature.from)?;
        let to = get_column_by_name(table, &feature.to)?;
        let from = downcast_array::<Date32Array>(&from, &feature.from, "Date32")?;
        let to = downcast_array::<Date32Array>(&to, &feature.to, "Date32")?;

        let days: ArrayRef = Arc::new(days_between(from, to));
        new_columns.push((Field::new(&feature.name, DataType::Int64, true), days));
    }
    append_columns(table, new_columns)
}

/// Report every negative value in the named duration columns
pub fn find_negative_durations(table: &RecordBatch, columns: &[&str]) -> Result<Vec<DurationAnomaly>> {
    let mut anomalies = Vec::new();
    for column in columns {
        let array = get_column_by_name(table, column)?;
        let days = downcast_array::<Int64Array>(&array, column, "Int64")?;
        anomalies.extend(days.iter().enumerate().filter_map(|(row, value)| {
            value.filter(|d| *d < 0).map(|d| DurationAnomaly {
                row,
                column: (*column).to_string(),
                days: d,
            })
        }));
    }
    Ok(anomalies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn dates(values: Vec<Option<i32>>) -> ArrayRef {
        Arc::new(Date32Array::from(values))
    }

    #[test]
    fn test_elapsed_times_signed_and_nullable() {
        let table = RecordBatch::try_from_iter(vec![
            ("application_date", dates(vec![Some(100), None, Some(100)])),
            ("issued_date", dates(vec![Some(110), Some(110), Some(90)])),
            ("final_date", dates(vec![Some(126), Some(120), None])),
        ])
        .unwrap();

        let out = derive_elapsed_times(&table, &ElapsedTime::defaults()).unwrap();
        let processing = out.column(3).as_any().downcast_ref::<Int64Array>().unwrap();
        let build = out.column(4).as_any().downcast_ref::<Int64Array>().unwrap();

        assert_eq!(processing.value(0), 10);
        assert!(processing.is_null(1));
        assert_eq!(processing.value(2), -10);
        assert_eq!(build.value(0), 16);
        assert_eq!(build.value(1), 10);
        assert!(build.is_null(2));

        let anomalies = find_negative_durations(&out, &["processing_time", "build_time"]).unwrap();
        assert_eq!(
            anomalies,
            vec![DurationAnomaly {
                row: 2,
                column: "processing_time".to_string(),
                days: -10,
            }]
        );
    }
}
