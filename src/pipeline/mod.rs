//! The ADU/ACS pipeline: load, unify, clean, derive, join, persist.
//!
//! [`transform`] is a pure function of the raw tables and the configuration;
//! [`run`] wraps it with input loading and output persistence.

pub mod acs;
pub mod features;
pub mod join;
pub mod permits;
pub mod persist;
pub mod unify;

use std::time::Instant;

use arrow::record_batch::RecordBatch;

use crate::census::StatisticalSource;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::loader::{RawInputs, load_inputs};
use crate::schema::SchemaParityReport;
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar, log_table_shape};

pub use acs::{CleanStatistical, clean_statistical_extract};
pub use features::{DurationAnomaly, ElapsedTime, derive_elapsed_times, find_negative_durations};
pub use join::left_join;
pub use permits::clean_permits;
pub use persist::persist_outputs;
pub use unify::{UnifiedPermits, unify_permits};

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Cleaned permits with elapsed-time features
    pub permits: RecordBatch,
    pub acs_tabular: RecordBatch,
    pub acs_geometry: RecordBatch,
    /// Permits left-joined to the tabular measures
    pub joined: RecordBatch,
    /// Differences between the two permit schemas, if any
    pub parity: Option<SchemaParityReport>,
    /// Negative elapsed times, left in the data as found
    pub anomalies: Vec<DurationAnomaly>,
}

/// Turn the raw inputs into the cleaned and joined tables
pub fn transform(raw: &RawInputs, config: &PipelineConfig) -> Result<PipelineOutput> {
    let unified = unify_permits(
        &raw.attached,
        &raw.detached,
        &config.date_formats,
        config.fail_on_schema_mismatch,
    )?;

    let permits = clean_permits(&unified.table, &config.permits, &config.date_formats)?;
    let features = &config.permits.elapsed_times;
    let permits = derive_elapsed_times(&permits, features)?;
    let names: Vec<&str> = features.iter().map(|f| f.name.as_str()).collect();
    let anomalies = find_negative_durations(&permits, &names)?;
    if !anomalies.is_empty() {
        log::warn!("{} negative elapsed times kept as recorded", anomalies.len());
        for anomaly in &anomalies {
            log::debug!(
                "  row {}: {} = {} days",
                anomaly.row,
                anomaly.column,
                anomaly.days
            );
        }
    }
    log_table_shape("adu_data", &permits);

    let statistical =
        clean_statistical_extract(&raw.statistical, &config.acs, config.permits.tract_key_width)?;
    log_table_shape("acs_data", &statistical.tabular);

    let joined = left_join(
        &permits,
        &statistical.tabular,
        &config.permits.geoid_column,
        &config.acs.prefixed_key(),
    )?;
    let unmatched = join::unmatched_rows(&joined, &config.acs.prefixed_key());
    if unmatched > 0 {
        log::warn!("{unmatched} permits have no matching tract");
    }
    log_table_shape("adu_acs_data", &joined);

    Ok(PipelineOutput {
        permits,
        acs_tabular: statistical.tabular,
        acs_geometry: statistical.geometry,
        joined,
        parity: unified.parity,
        anomalies,
    })
}

/// Load, transform and persist, returning the run's tables
pub fn run(config: &PipelineConfig, source: &dyn StatisticalSource) -> Result<PipelineOutput> {
    let start = Instant::now();
    let progress = create_main_progress_bar(3, Some("Loading inputs"));

    let raw = load_inputs(config, source)?;
    progress.inc(1);

    progress.set_message("Transforming");
    let output = transform(&raw, config)?;
    progress.inc(1);

    progress.set_message("Writing outputs");
    let written = persist_outputs(&output, config)?;
    progress.inc(1);
    finish_progress_bar(&progress, Some("Pipeline complete"));

    log::info!(
        "Wrote {} artifacts to {} in {:?}",
        written.len(),
        config.clean_dir().display(),
        start.elapsed()
    );
    Ok(output)
}
