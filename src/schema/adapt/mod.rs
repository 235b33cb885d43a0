//! Module for handling data type adaptation between mismatched schemas.

pub mod compatibility;
pub mod conversions;
pub mod date_utils;
pub mod schema_compat;
pub mod types;

pub use compatibility::{
    check_type_compatibility, common_supertype, determine_adaptation_strategy, is_integer,
    is_numeric, is_string, is_temporal,
};
pub use conversions::{categorical_type, convert_array, create_null_array, to_nullable_int64};
pub use date_utils::{
    date_to_days, days_to_date, detect_date_format, parse_date_column, parse_date_string,
    strip_clock_time,
};
pub use schema_compat::{
    EnhancedSchemaCompatibilityReport, SchemaAdaptation, SchemaAdaptationIssue,
    adapt_record_batch, check_schema_with_adaptation,
};
pub use types::{AdaptationStrategy, AdapterError, DateFormatConfig, Result, TypeCompatibility};
