//! Statistical-extract cleaner.
//!
//! Turns the raw ACS extract into a prefixed tabular projection and a
//! separate geometry projection sharing the same tract key.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::compute::kernels::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;

use crate::config::AcsConfig;
use crate::error::{PipelineError, Result};
use crate::schema::adapt::is_integer;
use crate::schema::normalize_column_name;
use crate::utils::arrow::{
    downcast_array, drop_columns, get_column_by_name, get_column_index, rename_columns,
    replace_column, select_columns,
};

/// The cleaned statistical extract
#[derive(Debug, Clone)]
pub struct CleanStatistical {
    /// Tract key plus one column per variable
    pub tabular: RecordBatch,
    /// Tract key plus tract polygon
    pub geometry: RecordBatch,
}

/// Render a tract key column as text; integer keys are zero-padded to `width`
pub fn tract_key_to_text(array: &ArrayRef, column: &str, width: usize) -> Result<ArrayRef> {
    if is_integer(array.data_type()) {
        let ints = cast::cast(array, &DataType::Int64)?;
        let ints = downcast_array::<arrow::array::Int64Array>(&ints, column, "Int64")?;
        let text: StringArray = ints
            .iter()
            .map(|v| v.map(|v| format!("{v:0width$}")))
            .collect();
        return Ok(Arc::new(text));
    }
    Ok(cast::cast(array, &DataType::Utf8)?)
}

/// Clean the raw extract and split it into tabular and geometry projections
pub fn clean_statistical_extract(
    raw: &RecordBatch,
    acs: &AcsConfig,
    key_width: usize,
) -> Result<CleanStatistical> {
    for locator in &acs.locator_columns {
        get_column_index(raw, locator)?;
    }
    let table = drop_columns(raw, &acs.locator_columns)?;

    get_column_index(&table, &acs.geoid_column)?;
    get_column_index(&table, &acs.geometry_column)?;
    let mut labels: FxHashMap<&str, &str> = FxHashMap::default();
    labels.insert(acs.geoid_column.as_str(), acs.key_column.as_str());
    for variable in &acs.variables {
        get_column_index(&table, &variable.code)
            .map_err(|_| PipelineError::column_not_found(&variable.code))?;
        labels.insert(variable.code.as_str(), variable.label.as_str());
    }

    let table = rename_columns(&table, |name| {
        let label = labels.get(name).copied().unwrap_or(name);
        format!("{}{}", acs.prefix, normalize_column_name(label))
    })?;

    let key = acs.prefixed_key();
    let key_text = tract_key_to_text(&get_column_by_name(&table, &key)?, &key, key_width)?;
    let table = replace_column(&table, &key, key_text)?;

    let geometry_column = acs.prefixed_geometry();
    let geometry = select_columns(&table, &[key.as_str(), geometry_column.as_str()])?;
    let tabular = drop_columns(&table, &[geometry_column.as_str()])?;

    log::info!(
        "Cleaned statistical extract: {} tracts, {} measures",
        tabular.num_rows(),
        tabular.num_columns() - 1
    );
    Ok(CleanStatistical { tabular, geometry })
}
