//! Unifier: schema parity check and row concatenation of the permit sources.

use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::{PipelineError, Result};
use crate::schema::adapt::{
    DateFormatConfig, adapt_record_batch, check_schema_with_adaptation, common_supertype,
};
use crate::schema::{SchemaParityReport, check_schema_parity};
use crate::utils::logging::log_warning;

/// Concatenated permits together with the outcome of the parity check
#[derive(Debug, Clone)]
pub struct UnifiedPermits {
    pub table: RecordBatch,
    /// `None` when both schemas matched exactly
    pub parity: Option<SchemaParityReport>,
}

/// Concatenate rows of both tables, keeping only the columns they share.
///
/// Columns follow the first table's order. A column typed differently in
/// the two tables is converted to a type both can be represented in.
pub fn concat_common_columns(
    first: &RecordBatch,
    second: &RecordBatch,
    date_config: &DateFormatConfig,
) -> Result<RecordBatch> {
    let first_schema = first.schema();
    let second_schema = second.schema();

    let fields: Vec<Field> = first_schema
        .fields()
        .iter()
        .filter_map(|f| {
            let other = second_schema.field_with_name(f.name()).ok()?;
            let data_type = common_supertype(f.data_type(), other.data_type());
            Some(Field::new(f.name(), data_type, true))
        })
        .collect();
    let target = Schema::new(fields);

    for (label, schema) in [("aadu", &first_schema), ("dadu", &second_schema)] {
        let report = check_schema_with_adaptation(schema, &target);
        for adaptation in &report.adaptations {
            log::debug!(
                "{label}.{}: {} -> {} ({:?})",
                adaptation.field_name,
                adaptation.source_type,
                adaptation.target_type,
                adaptation.adaptation_strategy
            );
        }
    }

    let first = adapt_record_batch(first, &target, date_config)?;
    let second = adapt_record_batch(second, &target, date_config)?;
    Ok(concat_batches(&Arc::new(target), [&first, &second])?)
}

/// Check parity, then concatenate.
///
/// With `fail_on_mismatch` a parity report aborts the run; otherwise every
/// issue is logged and concatenation proceeds on the shared columns.
pub fn unify_permits(
    first: &RecordBatch,
    second: &RecordBatch,
    date_config: &DateFormatConfig,
    fail_on_mismatch: bool,
) -> Result<UnifiedPermits> {
    let parity = match check_schema_parity(&first.schema(), &second.schema(), "aadu", "dadu") {
        Ok(()) => {
            log::info!("Permit sources share an identical schema");
            None
        }
        Err(report) => {
            if fail_on_mismatch {
                return Err(PipelineError::SchemaMismatch(report));
            }
            for issue in &report.issues {
                log_warning(&format!("Schema mismatch between permit sources: {issue}"), None);
            }
            Some(report)
        }
    };

    let table = concat_common_columns(first, second, date_config)?;
    log::info!(
        "Unified {} + {} permits into {} rows x {} columns",
        first.num_rows(),
        second.num_rows(),
        table.num_rows(),
        table.num_columns()
    );
    Ok(UnifiedPermits { table, parity })
}
