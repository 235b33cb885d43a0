//! Module for handling data type compatibility checks.

use arrow::datatypes::DataType;
use crate::schema::adapt::types::{AdaptationStrategy, TypeCompatibility};

/// Check if two Arrow data types are compatible for conversion
#[must_use]
pub fn check_type_compatibility(from: &DataType, to: &DataType) -> TypeCompatibility {
    if from == to {
        return TypeCompatibility::Exact;
    }

    match (from, to) {
        // CSV inference yields Null for columns that are empty in one file
        (DataType::Null, _) => TypeCompatibility::Compatible,

        // Numeric type conversions (widening)
        (DataType::Int8, DataType::Int16 | DataType::Int32 | DataType::Int64)
        | (DataType::Int16, DataType::Int32 | DataType::Int64)
        | (DataType::Int32, DataType::Int64)
        | (DataType::UInt8, DataType::UInt16 | DataType::UInt32 | DataType::UInt64)
        | (DataType::UInt16, DataType::UInt32 | DataType::UInt64)
        | (DataType::UInt32, DataType::UInt64)
        | (DataType::Float32, DataType::Float64) => TypeCompatibility::Compatible,

        // Integer to float conversions
        (
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64,
            DataType::Float64,
        ) => TypeCompatibility::Compatible,

        // Strings parse into dates and numbers; unparsable values become null
        (DataType::Utf8 | DataType::LargeUtf8, t) if is_temporal(t) || is_numeric(t) => {
            TypeCompatibility::Compatible
        }

        // Everything renders as text
        (f, DataType::Utf8 | DataType::LargeUtf8)
            if is_numeric(f) || is_temporal(f) || is_string(f) || f == &DataType::Boolean =>
        {
            TypeCompatibility::Compatible
        }

        // Date and timestamp interconversions
        (DataType::Date32 | DataType::Timestamp(_, _), DataType::Date64)
        | (DataType::Date32 | DataType::Date64, DataType::Timestamp(_, _))
        | (DataType::Date64 | DataType::Timestamp(_, _), DataType::Date32) => {
            TypeCompatibility::Compatible
        }

        _ => TypeCompatibility::Incompatible,
    }
}

/// Identifies whether a data type is numeric
#[must_use]
pub const fn is_numeric(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
    )
}

/// Identifies whether a data type is an integer type
#[must_use]
pub const fn is_integer(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Identifies whether a data type is a string type
#[must_use]
pub const fn is_string(data_type: &DataType) -> bool {
    matches!(data_type, DataType::Utf8 | DataType::LargeUtf8)
}

/// Identifies whether a data type is a date or timestamp type
#[must_use]
pub const fn is_temporal(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _)
    )
}

/// Smallest type both inputs can be converted into without losing values.
///
/// Integers widen to `Int64`, mixed numerics to `Float64`, and anything else
/// falls back to `Utf8`.
#[must_use]
pub fn common_supertype(left: &DataType, right: &DataType) -> DataType {
    match (left, right) {
        (l, r) if l == r => l.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (l, r) if is_integer(l) && is_integer(r) => DataType::Int64,
        (l, r) if is_numeric(l) && is_numeric(r) => DataType::Float64,
        _ => DataType::Utf8,
    }
}

/// Determine the appropriate adaptation strategy for a given source and target type
#[must_use]
pub const fn determine_adaptation_strategy(
    source_type: &DataType,
    target_type: &DataType,
) -> AdaptationStrategy {
    match (source_type, target_type) {
        (s, t) if is_string(s) && is_temporal(t) => AdaptationStrategy::DateParsing,
        (s, t) if is_string(s) && is_numeric(t) => AdaptationStrategy::NumericParsing,
        (s, t) if is_numeric(s) && is_numeric(t) => AdaptationStrategy::NumericConversion,
        (_, DataType::Utf8 | DataType::LargeUtf8) => AdaptationStrategy::StringConversion,
        _ => AdaptationStrategy::AutoCast,
    }
}
