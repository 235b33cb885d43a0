//! Module for handling schema compatibility with adaptation support.

use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;

use crate::schema::adapt::compatibility::{check_type_compatibility, determine_adaptation_strategy};
use crate::schema::adapt::conversions::{convert_array, create_null_array};
use crate::schema::adapt::types::{
    AdaptationStrategy, AdapterError, DateFormatConfig, Result, TypeCompatibility,
};

/// A schema compatibility report with adaptation information
#[derive(Debug)]
pub struct EnhancedSchemaCompatibilityReport {
    /// Whether all schemas are compatible with adaptation
    pub compatible: bool,
    /// Incompatibilities that cannot be resolved with adaptation
    pub issues: Vec<SchemaAdaptationIssue>,
    /// Adaptations that will be performed
    pub adaptations: Vec<SchemaAdaptation>,
}

/// A schema compatibility issue with adaptation context
#[derive(Debug)]
pub struct SchemaAdaptationIssue {
    pub field_name: String,
    pub source_type: DataType,
    pub target_type: DataType,
    pub description: String,
}

/// A schema adaptation to be performed
#[derive(Debug)]
pub struct SchemaAdaptation {
    pub field_name: String,
    pub source_type: DataType,
    pub target_type: DataType,
    pub adaptation_strategy: AdaptationStrategy,
}

/// Check schema compatibility with adaptation options
#[must_use]
pub fn check_schema_with_adaptation(
    source_schema: &Schema,
    target_schema: &Schema,
) -> EnhancedSchemaCompatibilityReport {
    let mut issues = Vec::new();
    let mut adaptations = Vec::new();
    let mut all_compatible = true;

    for target_field in target_schema.fields() {
        let field_name = target_field.name();

        if let Ok(source_field) = source_schema.field_with_name(field_name) {
            let source_type = source_field.data_type();
            let target_type = target_field.data_type();

            match check_type_compatibility(source_type, target_type) {
                TypeCompatibility::Exact => {}
                TypeCompatibility::Compatible => {
                    adaptations.push(SchemaAdaptation {
                        field_name: field_name.to_string(),
                        source_type: source_type.clone(),
                        target_type: target_type.clone(),
                        adaptation_strategy: determine_adaptation_strategy(source_type, target_type),
                    });
                }
                TypeCompatibility::Incompatible => {
                    all_compatible = false;
                    issues.push(SchemaAdaptationIssue {
                        field_name: field_name.to_string(),
                        source_type: source_type.clone(),
                        target_type: target_type.clone(),
                        description: format!(
                            "Incompatible types for field '{field_name}': {source_type:?} cannot be converted to {target_type:?}"
                        ),
                    });
                }
            }
        } else {
            // Missing fields are filled with nulls
            adaptations.push(SchemaAdaptation {
                field_name: field_name.to_string(),
                source_type: DataType::Null,
                target_type: target_field.data_type().clone(),
                adaptation_strategy: AdaptationStrategy::AutoCast,
            });
        }
    }

    EnhancedSchemaCompatibilityReport {
        compatible: all_compatible,
        issues,
        adaptations,
    }
}

/// Convert a record batch to match the target schema with type adaptation
pub fn adapt_record_batch(
    batch: &RecordBatch,
    target_schema: &Schema,
    date_config: &DateFormatConfig,
) -> Result<RecordBatch> {
    let source_schema = batch.schema();
    let mut adapted_columns: Vec<ArrayRef> = Vec::with_capacity(target_schema.fields().len());

    for target_field in target_schema.fields() {
        let field_name = target_field.name();
        let target_type = target_field.data_type();

        if let Ok(source_idx) = source_schema.index_of(field_name) {
            let source_array = batch.column(source_idx);
            let source_type = source_array.data_type();

            match check_type_compatibility(source_type, target_type) {
                TypeCompatibility::Exact => adapted_columns.push(source_array.clone()),
                TypeCompatibility::Compatible => {
                    log::debug!("Adapting column '{field_name}' from {source_type:?} to {target_type:?}");
                    adapted_columns.push(convert_array(source_array, target_type, date_config)?);
                }
                TypeCompatibility::Incompatible => {
                    return Err(AdapterError::ValidationError(format!(
                        "Incompatible types for field '{field_name}': {source_type:?} -> {target_type:?}"
                    )));
                }
            }
        } else {
            adapted_columns.push(create_null_array(target_type, batch.num_rows())?);
        }
    }

    RecordBatch::try_new(Arc::new(target_schema.clone()), adapted_columns)
        .map_err(AdapterError::ArrowError)
}
