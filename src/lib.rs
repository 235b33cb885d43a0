//! Load Seattle accessory-dwelling-unit permits, clean them, derive
//! elapsed-time features and join them to ACS census tract estimates,
//! writing the results as Arrow/Parquet files.

pub mod census;
pub mod config;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod pipeline;
pub mod schema;
pub mod utils;

// Re-export the most common types for easier use
pub use census::{CensusClient, StatisticalSource, TractRecord, build_extract_batch};
pub use config::{AcsConfig, OutputFormat, PermitCleaningConfig, PipelineConfig, PlaceConfig};
pub use error::{PipelineError, Result};
pub use loader::{RawInputs, load_inputs};
pub use pipeline::{PipelineOutput, run, transform};
pub use schema::{SchemaParityReport, check_schema_parity};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Utility functions
pub use utils::io::{read_csv, read_table, write_table};
