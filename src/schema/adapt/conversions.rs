//! Module for converting between different array types.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, NullArray};
use arrow::compute::kernels::cast;
use arrow::datatypes::DataType;

use crate::schema::adapt::compatibility::{is_integer, is_numeric};
use crate::schema::adapt::date_utils::parse_date_column;
use crate::schema::adapt::types::{AdapterError, DateFormatConfig, Result};

/// Dictionary encoding used for categorical columns
#[must_use]
pub fn categorical_type() -> DataType {
    DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
}

/// Convert an Arrow array to match the target data type
pub fn convert_array(
    array: &ArrayRef,
    target_type: &DataType,
    date_config: &DateFormatConfig,
) -> Result<ArrayRef> {
    let source_type = array.data_type();

    if source_type == target_type {
        return Ok(array.clone());
    }

    match (source_type, target_type) {
        (DataType::Null, t) => create_null_array(t, array.len()),

        // String to date goes through the lenient multi-format parser
        (DataType::Utf8 | DataType::LargeUtf8, &DataType::Date32) => {
            parse_date_column(array, date_config)
        }

        (s, &DataType::Int64) if is_numeric(s) && !is_integer(s) => to_nullable_int64(array),

        // Categories are stored as text dictionaries whatever the source type
        (s, DataType::Dictionary(_, _)) if s != &DataType::Utf8 => {
            let text = cast::cast(array, &DataType::Utf8)?;
            cast::cast(&text, target_type).map_err(AdapterError::ArrowError)
        }

        // Arrow casts are safe by default: values that cannot be converted become null
        _ => cast::cast(array, target_type).map_err(|e| {
            AdapterError::ConversionError(format!(
                "Failed to convert from {source_type:?} to {target_type:?}: {e}"
            ))
        }),
    }
}

/// Create a null array of the specified type and length
pub fn create_null_array(data_type: &DataType, length: usize) -> Result<ArrayRef> {
    let null_array: ArrayRef = Arc::new(NullArray::new(length));
    match cast::cast(&null_array, data_type) {
        Ok(array) => Ok(array),
        Err(e) => Err(AdapterError::ConversionError(format!(
            "Failed to create null array of type {data_type:?}: {e}"
        ))),
    }
}

/// Convert a column into `Int64`, keeping nulls as "not recorded".
///
/// Floating point values must be integral; `2.5` is a conversion error
/// rather than a silent truncation.
pub fn to_nullable_int64(array: &ArrayRef) -> Result<ArrayRef> {
    match array.data_type() {
        DataType::Int64 => Ok(array.clone()),
        t if is_integer(t) || t == &DataType::Null => {
            cast::cast(array, &DataType::Int64).map_err(AdapterError::ArrowError)
        }
        _ => {
            let floats = cast::cast(array, &DataType::Float64)?;
            let floats = floats
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| AdapterError::ValidationError("Expected Float64Array".to_string()))?;

            let ints = floats
                .iter()
                .map(|value| match value {
                    None => Ok(None),
                    Some(v) if v.is_nan() => Ok(None),
                    #[allow(clippy::cast_possible_truncation)]
                    Some(v) if v.fract() == 0.0 && v.is_finite() => Ok(Some(v as i64)),
                    Some(v) => Err(AdapterError::ConversionError(format!(
                        "Cannot represent {v} as an integer"
                    ))),
                })
                .collect::<Result<Int64Array>>()?;

            Ok(Arc::new(ints) as ArrayRef)
        }
    }
}
