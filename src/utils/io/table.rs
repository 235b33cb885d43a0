//! Columnar table persistence
//!
//! Tables are written either as Arrow IPC files (Feather v2) or as Parquet.
//! Each artifact is written independently; there is no multi-file atomicity.

use std::path::Path;
use std::time::Instant;

use arrow::compute::concat_batches;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::config::OutputFormat;
use crate::error::util::{safe_create_file, safe_open_file};
use crate::error::{PipelineError, Result};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Write one table to `path` in the given format
pub fn write_table(batch: &RecordBatch, path: &Path, format: OutputFormat) -> Result<()> {
    let start = Instant::now();
    log_operation_start("Writing table to", path);

    let file = safe_create_file(path)?;
    match format {
        OutputFormat::Feather => {
            let mut writer = FileWriter::try_new(file, &batch.schema())?;
            writer.write(batch)?;
            writer.finish()?;
        }
        OutputFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(batch)?;
            writer.close()?;
        }
    }

    log_operation_complete("wrote", path, batch.num_rows(), Some(start.elapsed()));
    Ok(())
}

/// Read a table written by [`write_table`]; the format follows the extension
pub fn read_table(path: &Path) -> Result<RecordBatch> {
    let format = OutputFormat::from_path(path).ok_or_else(|| {
        PipelineError::Config(format!("unknown table format for {}", path.display()))
    })?;
    let file = safe_open_file(path, "reading table")?;

    let (schema, batches) = match format {
        OutputFormat::Feather => {
            let reader = FileReader::try_new(file, None)?;
            let schema = reader.schema();
            let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
            (schema, batches)
        }
        OutputFormat::Parquet => {
            let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
            let schema = arrow::record_batch::RecordBatchReader::schema(&reader);
            let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
            (schema, batches)
        }
    };

    Ok(concat_batches(&schema, &batches)?)
}
