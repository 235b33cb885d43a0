//! Permit cleaner: subsetting, renaming, retyping, tract keys and point geometry.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Date32Array, DictionaryArray, Float64Array, Int32Array, StringArray,
};
use arrow::compute::kernels::cast;
use arrow::datatypes::{DataType, Field, Int32Type};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;

use crate::config::PermitCleaningConfig;
use crate::error::{PipelineError, Result};
use crate::geometry::{EPSG_4326, geometry_field, points_from_xy};
use crate::schema::adapt::{
    DateFormatConfig, categorical_type, convert_array, days_to_date, parse_date_column,
    to_nullable_int64,
};
use crate::schema::normalize_column_name;
use crate::utils::arrow::{
    append_columns, downcast_array, get_column_by_name, null_counts, rename_columns,
    replace_column, select_columns,
};

/// Run every cleaning step over the unified permit table
pub fn clean_permits(
    table: &RecordBatch,
    config: &PermitCleaningConfig,
    date_config: &DateFormatConfig,
) -> Result<RecordBatch> {
    let mut table = select_columns(table, &config.columns)?;
    log_missingness(&table);

    table = rename_columns(&table, normalize_column_name)?;
    table = parse_dates(&table, &config.date_columns, date_config)?;
    table = decompose_dates(&table)?;
    table = coerce_categories(&table, &config.categorical_columns, date_config)?;
    for (column, from, to) in &config.category_renames {
        table = rename_category(&table, column, from, to)?;
    }
    table = coerce_integers(&table, &config.integer_columns)?;

    let geoid = get_column_by_name(&table, &config.geoid_column)?;
    let tract_key = derive_tract_key(
        &geoid,
        &config.geoid_column,
        config.source_geoid_width,
        config.tract_key_width,
    )?;
    table = replace_column(&table, &config.geoid_column, tract_key)?;

    attach_points(&table, config)
}

fn log_missingness(table: &RecordBatch) {
    for (column, nulls) in null_counts(table) {
        if nulls > 0 {
            log::info!("Missing values in '{column}': {nulls} of {}", table.num_rows());
        }
    }
}

/// Parse the named columns into `Date32`; unparsable values become null
pub fn parse_dates(
    table: &RecordBatch,
    columns: &[String],
    date_config: &DateFormatConfig,
) -> Result<RecordBatch> {
    let mut table = table.clone();
    for column in columns {
        let parsed = parse_date_column(&get_column_by_name(&table, column)?, date_config)?;
        table = replace_column(&table, column, parsed)?;
    }
    Ok(table)
}

/// Append `_day`, `_month` and `_year` for every `Date32` column named `*_date`
pub fn decompose_dates(table: &RecordBatch) -> Result<RecordBatch> {
    let schema = table.schema();
    let mut new_columns = Vec::new();

    for (field, column) in schema.fields().iter().zip(table.columns()) {
        if !field.name().ends_with("_date") {
            continue;
        }
        let dates = downcast_array::<Date32Array>(column, field.name(), "Date32")?;
        let component = |f: fn(chrono::NaiveDate) -> i32| -> ArrayRef {
            let values: Int32Array = dates
                .iter()
                .map(|days| days.and_then(days_to_date).map(f))
                .collect();
            Arc::new(values)
        };

        #[allow(clippy::cast_possible_wrap)]
        let parts: [(&str, ArrayRef); 3] = [
            ("day", component(|d| d.day() as i32)),
            ("month", component(|d| d.month() as i32)),
            ("year", component(|d| d.year())),
        ];
        for (suffix, array) in parts {
            new_columns.push((
                Field::new(format!("{}_{suffix}", field.name()), DataType::Int32, true),
                array,
            ));
        }
    }

    append_columns(table, new_columns)
}

/// Dictionary-encode the named columns
pub fn coerce_categories(
    table: &RecordBatch,
    columns: &[String],
    date_config: &DateFormatConfig,
) -> Result<RecordBatch> {
    let mut table = table.clone();
    for column in columns {
        let array = get_column_by_name(&table, column)?;
        let categorical = convert_array(&array, &categorical_type(), date_config)?;
        table = replace_column(&table, column, categorical)?;
    }
    Ok(table)
}

/// Rename one category of a dictionary column.
///
/// When `to` is already a category the two are merged, so the dictionary
/// values stay unique.
pub fn rename_category(table: &RecordBatch, column: &str, from: &str, to: &str) -> Result<RecordBatch> {
    let array = get_column_by_name(table, column)?;
    let dict = downcast_array::<DictionaryArray<Int32Type>>(&array, column, "Dictionary(Int32, Utf8)")?;
    let labels = downcast_array::<StringArray>(dict.values(), column, "Utf8 dictionary values")?;

    if !labels.iter().flatten().any(|label| label == from) {
        log::debug!("Category '{from}' not present in '{column}', nothing to rename");
        return Ok(table.clone());
    }
    if labels.iter().flatten().any(|label| label == to) {
        log::info!("Category '{to}' already present in '{column}', merging '{from}' into it");
    }

    let text = cast::cast(&array, &DataType::Utf8)?;
    let text = downcast_array::<StringArray>(&text, column, "Utf8")?;
    let renamed: ArrayRef = Arc::new(
        text.iter()
            .map(|label| label.map(|l| if l == from { to } else { l }))
            .collect::<StringArray>(),
    );
    let categorical = cast::cast(&renamed, &categorical_type())?;
    log::info!("Renamed category '{from}' to '{to}' in '{column}'");
    replace_column(table, column, categorical)
}

/// Convert the named columns into nullable `Int64`
pub fn coerce_integers(table: &RecordBatch, columns: &[String]) -> Result<RecordBatch> {
    let mut table = table.clone();
    for column in columns {
        let array = get_column_by_name(&table, column)?;
        let ints = to_nullable_int64(&array)?;
        table = replace_column(&table, column, ints)?;
    }
    Ok(table)
}

/// Truncate block-level geographic codes into tract keys.
///
/// Each code is rendered as text (integral floats without a decimal part)
/// and must be exactly `source_width`
/// characters; the first `key_width` characters are kept. Nulls stay null.
pub fn derive_tract_key(
    codes: &ArrayRef,
    column: &str,
    source_width: usize,
    key_width: usize,
) -> Result<ArrayRef> {
    let codes = match codes.data_type() {
        DataType::Float16 | DataType::Float32 | DataType::Float64 => to_nullable_int64(codes)?,
        _ => codes.clone(),
    };
    let text = cast::cast(&codes, &DataType::Utf8)?;
    let text = downcast_array::<StringArray>(&text, column, "Utf8")?;

    let keys = text
        .iter()
        .enumerate()
        .map(|(row, code)| {
            let Some(code) = code else {
                return Ok(None);
            };
            let width = code.chars().count();
            match code.get(..key_width) {
                Some(key) if width == source_width && code.is_ascii() => Ok(Some(key.to_string())),
                _ => Err(PipelineError::InvalidTractKey {
                    row,
                    value: code.to_string(),
                    width,
                    expected: source_width,
                }),
            }
        })
        .collect::<Result<StringArray>>()?;

    Ok(Arc::new(keys))
}

/// Append a WKB point geometry built from longitude/latitude
pub fn attach_points(table: &RecordBatch, config: &PermitCleaningConfig) -> Result<RecordBatch> {
    let as_f64 = |name: &str| -> Result<ArrayRef> {
        Ok(cast::cast(&get_column_by_name(table, name)?, &DataType::Float64)?)
    };
    let longitude = as_f64(&config.longitude_column)?;
    let latitude = as_f64(&config.latitude_column)?;
    let longitude = downcast_array::<Float64Array>(&longitude, &config.longitude_column, "Float64")?;
    let latitude = downcast_array::<Float64Array>(&latitude, &config.latitude_column, "Float64")?;

    let points = points_from_xy(longitude, latitude);
    let missing = points.null_count();
    if missing > 0 {
        log::warn!("{missing} permits have no coordinates; their geometry is null");
    }

    append_columns(
        table,
        vec![(geometry_field(&config.geometry_column, EPSG_4326), points)],
    )
}
