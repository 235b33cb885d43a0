use adu_pipeline::config::OutputFormat;
use adu_pipeline::pipeline::persist_outputs;
use adu_pipeline::{PipelineConfig, read_table, transform};
use adu_pipeline::loader::load_inputs;

use crate::utils::{FixtureSource, fixture_config};

fn run_to_disk(config: &PipelineConfig) -> (adu_pipeline::PipelineOutput, Vec<std::path::PathBuf>) {
    let source = FixtureSource::seattle(&config.acs);
    let raw = load_inputs(config, &source).unwrap();
    let output = transform(&raw, config).unwrap();
    let written = persist_outputs(&output, config).unwrap();
    (output, written)
}

#[test]
fn test_feather_artifacts_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());
    let (output, written) = run_to_disk(&config);

    assert_eq!(written.len(), 4);
    let expected = [
        &output.permits,
        &output.acs_tabular,
        &output.acs_geometry,
        &output.joined,
    ];
    for (path, table) in written.iter().zip(expected) {
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("feather"));
        let read_back = read_table(path).unwrap();
        assert_eq!(&read_back, table, "round trip of {}", path.display());
    }
}

#[test]
fn test_parquet_artifacts_keep_columns_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture_config(dir.path());
    config.output_format = OutputFormat::Parquet;
    let (output, written) = run_to_disk(&config);

    let joined_path = config.clean_dir().join("adu_acs_data.parquet");
    assert!(written.contains(&joined_path));

    let read_back = read_table(&joined_path).unwrap();
    assert_eq!(read_back.num_rows(), output.joined.num_rows());
    assert_eq!(read_back.num_columns(), output.joined.num_columns());
    for (read, original) in read_back.columns().iter().zip(output.joined.columns()) {
        assert_eq!(read.logical_null_count(), original.logical_null_count());
    }
}
