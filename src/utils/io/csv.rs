//! Delimited-text loading
//!
//! Reads a CSV with a header row into a single record batch, inferring
//! column types from every record.

use std::io::Seek;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::record_batch::RecordBatch;

use crate::error::util::safe_open_file;
use crate::error::{PipelineError, Result};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Default batch size for CSV decoding
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Read a CSV file into one record batch
///
/// # Errors
/// A missing file is an IO error; malformed rows surface as Arrow errors.
pub fn read_csv(path: &Path) -> Result<RecordBatch> {
    let start = Instant::now();
    log_operation_start("Reading CSV file", path);

    let mut file = safe_open_file(path, "reading permit extract")?;
    let format = Format::default().with_header(true);
    let (schema, records) = format.infer_schema(&mut file, None)?;
    log::debug!("Inferred {} columns from {records} records", schema.fields().len());
    file.rewind().map_err(|e| PipelineError::io(path, e))?;

    let schema = Arc::new(schema);
    let reader = ReaderBuilder::new(schema.clone())
        .with_format(format)
        .with_batch_size(DEFAULT_BATCH_SIZE)
        .build(file)?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let batch = concat_batches(&schema, &batches)?;

    log_operation_complete("read", path, batch.num_rows(), Some(start.elapsed()));
    Ok(batch)
}
