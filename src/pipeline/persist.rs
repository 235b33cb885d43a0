//! Persister: writes the four cleaned artifacts.

use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::utils::io::write_table;

use super::PipelineOutput;

/// Cleaned permits with derived features
pub const ADU_DATA: &str = "adu_data";
/// Tabular statistical measures
pub const ACS_DATA: &str = "acs_data";
/// Tract polygons
pub const ACS_GEO: &str = "acs_geo";
/// Permits joined to their tract measures
pub const ADU_ACS_DATA: &str = "adu_acs_data";

/// Write every artifact under the configured clean directory.
///
/// Artifacts are written one after another; a failure leaves the ones
/// already written in place.
pub fn persist_outputs(output: &PipelineOutput, config: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let artifacts = [
        (ADU_DATA, &output.permits),
        (ACS_DATA, &output.acs_tabular),
        (ACS_GEO, &output.acs_geometry),
        (ADU_ACS_DATA, &output.joined),
    ];

    let mut written = Vec::with_capacity(artifacts.len());
    for (stem, table) in artifacts {
        let path = config.output_path(stem);
        write_table(table, &path, config.output_format)?;
        written.push(path);
    }
    Ok(written)
}
