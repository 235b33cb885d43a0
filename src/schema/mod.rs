//! Schema parity checks between permit sources and column-name normalization.

pub mod adapt;

use std::fmt;

use arrow::datatypes::{DataType, Schema};
use itertools::Itertools;

pub use adapt::{
    AdaptationStrategy, AdapterError, DateFormatConfig, TypeCompatibility, adapt_record_batch,
    check_schema_with_adaptation, convert_array,
};

/// What kind of disagreement a [`SchemaIssue`] describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssueKind {
    /// Column exists in the reference source only
    MissingInOther,
    /// Column exists in the other source only
    MissingInReference,
    /// Column exists in both but at different positions
    PositionMismatch { reference: usize, other: usize },
    /// Column exists in both with different inferred types
    TypeMismatch { reference: DataType, other: DataType },
}

/// A single schema disagreement between two sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// The column the issue is about
    pub column: String,
    /// Kind of disagreement
    pub kind: SchemaIssueKind,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SchemaIssueKind::MissingInOther => {
                write!(f, "'{}' missing from the second source", self.column)
            }
            SchemaIssueKind::MissingInReference => {
                write!(f, "'{}' missing from the first source", self.column)
            }
            SchemaIssueKind::PositionMismatch { reference, other } => write!(
                f,
                "'{}' at position {reference} in the first source but {other} in the second",
                self.column
            ),
            SchemaIssueKind::TypeMismatch { reference, other } => write!(
                f,
                "'{}' typed {reference:?} in the first source but {other:?} in the second",
                self.column
            ),
        }
    }
}

/// Structured result of comparing two table schemas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaParityReport {
    /// Label of the reference source
    pub reference: String,
    /// Label of the compared source
    pub other: String,
    /// All disagreements found, reference columns first
    pub issues: Vec<SchemaIssue>,
}

impl SchemaParityReport {
    /// Whether any column exists in only one of the sources
    #[must_use]
    pub fn has_missing_columns(&self) -> bool {
        self.issues.iter().any(|i| {
            matches!(
                i.kind,
                SchemaIssueKind::MissingInOther | SchemaIssueKind::MissingInReference
            )
        })
    }
}

impl fmt::Display for SchemaParityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {}: {}",
            self.reference,
            self.other,
            self.issues.iter().join("; ")
        )
    }
}

/// Compare two schemas by column name, position, order and type.
///
/// Returns `Ok(())` when both schemas are identical column-for-column,
/// otherwise a report listing every disagreement. The caller decides
/// whether a mismatch is fatal.
pub fn check_schema_parity(
    reference: &Schema,
    other: &Schema,
    reference_label: &str,
    other_label: &str,
) -> std::result::Result<(), SchemaParityReport> {
    let mut issues = Vec::new();

    for (ref_idx, ref_field) in reference.fields().iter().enumerate() {
        let name = ref_field.name();
        match other.index_of(name) {
            Ok(other_idx) => {
                if other_idx != ref_idx {
                    issues.push(SchemaIssue {
                        column: name.clone(),
                        kind: SchemaIssueKind::PositionMismatch {
                            reference: ref_idx,
                            other: other_idx,
                        },
                    });
                }
                let other_type = other.field(other_idx).data_type();
                if other_type != ref_field.data_type() {
                    issues.push(SchemaIssue {
                        column: name.clone(),
                        kind: SchemaIssueKind::TypeMismatch {
                            reference: ref_field.data_type().clone(),
                            other: other_type.clone(),
                        },
                    });
                }
            }
            Err(_) => issues.push(SchemaIssue {
                column: name.clone(),
                kind: SchemaIssueKind::MissingInOther,
            }),
        }
    }

    for other_field in other.fields() {
        if reference.index_of(other_field.name()).is_err() {
            issues.push(SchemaIssue {
                column: other_field.name().clone(),
                kind: SchemaIssueKind::MissingInReference,
            });
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(SchemaParityReport {
            reference: reference_label.to_string(),
            other: other_label.to_string(),
            issues,
        })
    }
}

/// Lowercase a column name and replace spaces with underscores
#[must_use]
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}
