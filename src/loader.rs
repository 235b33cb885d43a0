//! Input loading: the two permit extracts and the tract-level statistical extract.

use std::path::Path;
use std::time::Instant;

use arrow::record_batch::RecordBatch;

use crate::census::StatisticalSource;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::utils::io::read_csv;
use crate::utils::logging::{create_spinner, finish_and_clear, log_table_shape};

/// The three raw tables a run starts from
#[derive(Debug, Clone)]
pub struct RawInputs {
    /// Attached-unit permits
    pub attached: RecordBatch,
    /// Detached-unit permits
    pub detached: RecordBatch,
    /// Statistical extract including tract geometry
    pub statistical: RecordBatch,
}

/// Read one permit extract
pub fn load_permits(path: &Path, label: &str) -> Result<RecordBatch> {
    let batch = read_csv(path)?;
    log_table_shape(label, &batch);
    Ok(batch)
}

/// Fetch the statistical extract, blocking until the source answers
pub fn fetch_statistical_extract(
    source: &dyn StatisticalSource,
    config: &PipelineConfig,
) -> Result<RecordBatch> {
    let start = Instant::now();
    let spinner = create_spinner(Some(&format!(
        "Fetching ACS {} tract estimates for {}",
        config.acs.year,
        config.place.label()
    )));
    let result = source.fetch_tracts(&config.place, &config.acs);
    finish_and_clear(&spinner);

    let batch = result?;
    log::info!("Fetched statistical extract in {:?}", start.elapsed());
    log_table_shape("acs_raw", &batch);
    Ok(batch)
}

/// Load every input of a run; any failure is fatal
pub fn load_inputs(config: &PipelineConfig, source: &dyn StatisticalSource) -> Result<RawInputs> {
    let attached = load_permits(&config.attached_permits_path(), "aadu_raw")?;
    let detached = load_permits(&config.detached_permits_path(), "dadu_raw")?;
    let statistical = fetch_statistical_extract(source, config)?;
    Ok(RawInputs {
        attached,
        detached,
        statistical,
    })
}
