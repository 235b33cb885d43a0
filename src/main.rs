use adu_pipeline::{CensusClient, PipelineConfig, run};
use anyhow::Context;
use log::info;

fn load_config() -> anyhow::Result<PipelineConfig> {
    let defaults = PipelineConfig::default();
    let path = defaults.data_dir.join(PipelineConfig::FILE_NAME);
    if path.exists() {
        info!("Using configuration from {}", path.display());
        return PipelineConfig::from_json_file(&path)
            .with_context(|| format!("invalid configuration in {}", path.display()));
    }
    Ok(defaults)
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let client = CensusClient::new();
    let output = run(&config, &client).context("pipeline run failed")?;
    info!(
        "Done: {} permits, {} tracts, {} joined rows",
        output.permits.num_rows(),
        output.acs_tabular.num_rows(),
        output.joined.num_rows()
    );
    if let Some(report) = &output.parity {
        info!("Permit schema differences: {report}");
    }
    Ok(())
}
