use arrow::array::{Array, BinaryArray, Float64Array, Int64Array, StringArray};
use arrow::compute::kernels::cast;
use arrow::datatypes::DataType;
use adu_pipeline::geometry::{Geometry, decode_column};
use adu_pipeline::loader::load_inputs;
use adu_pipeline::pipeline::{DurationAnomaly, ElapsedTime};
use adu_pipeline::{PipelineConfig, PipelineError, RecordBatch, run, transform};

use crate::utils::{FixtureSource, fixture_config};

fn column<'a, A: Array + 'static>(batch: &'a RecordBatch, name: &str) -> &'a A {
    let idx = batch.schema().index_of(name).unwrap();
    batch.column(idx).as_any().downcast_ref::<A>().unwrap()
}

fn text_values(batch: &RecordBatch, name: &str) -> Vec<Option<String>> {
    let idx = batch.schema().index_of(name).unwrap();
    let text = cast::cast(batch.column(idx), &DataType::Utf8).unwrap();
    let text = text.as_any().downcast_ref::<StringArray>().unwrap();
    text.iter().map(|v| v.map(str::to_string)).collect()
}

#[test]
fn test_reference_permit_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());
    let source = FixtureSource::seattle(&config.acs);

    let raw = load_inputs(&config, &source).unwrap();
    let output = transform(&raw, &config).unwrap();
    let permits = &output.permits;

    assert_eq!(permits.num_rows(), 4);
    assert!(output.parity.is_none());

    let processing = column::<Int64Array>(permits, "processing_time");
    let build = column::<Int64Array>(permits, "build_time");
    assert_eq!(processing.value(0), 10);
    assert_eq!(build.value(0), 16);

    let keys = column::<StringArray>(permits, "geoid20");
    assert_eq!(keys.value(0), "53033000100");
    assert!(keys.iter().flatten().all(|k| k.len() == 11));

    let points = decode_column(column::<BinaryArray>(permits, "geometry")).unwrap();
    assert_eq!(
        points[0],
        Some(Geometry::Point {
            x: -122.33,
            y: 47.61
        })
    );

    let types = text_values(permits, "type_of_dwelling_unit");
    assert_eq!(
        types,
        vec![
            Some("AADU".to_string()),
            Some("AADU".to_string()),
            Some("DADU".to_string()),
            Some("DADU".to_string()),
        ]
    );

    let year = column::<arrow::array::Int32Array>(permits, "application_date_year");
    assert_eq!(year.value(3), 2022);
}

#[test]
fn test_negative_durations_are_kept_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());
    let source = FixtureSource::seattle(&config.acs);

    let raw = load_inputs(&config, &source).unwrap();
    let output = transform(&raw, &config).unwrap();

    let processing = column::<Int64Array>(&output.permits, "processing_time");
    assert_eq!(processing.value(1), -9);
    assert_eq!(
        output.anomalies,
        vec![DurationAnomaly {
            row: 1,
            column: "processing_time".to_string(),
            days: -9,
        }]
    );
}

#[test]
fn test_unmatched_tract_gets_null_measures() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());
    let source = FixtureSource::seattle(&config.acs);

    let raw = load_inputs(&config, &source).unwrap();
    let output = transform(&raw, &config).unwrap();
    let joined = &output.joined;

    assert_eq!(joined.num_rows(), output.permits.num_rows());
    assert_eq!(
        joined.num_columns(),
        output.permits.num_columns() + output.acs_tabular.num_columns()
    );

    let total_hh = column::<Float64Array>(joined, "acs_total_hh");
    assert_eq!(total_hh.value(0), 100.0);
    assert_eq!(total_hh.value(1), 200.0);
    assert_eq!(total_hh.value(2), 100.0);
    assert!(total_hh.is_null(3));

    let family_hh = column::<Float64Array>(joined, "acs_family_hh");
    assert!(family_hh.is_null(1));

    let tract = column::<StringArray>(joined, "acs_geoid20");
    assert!(tract.is_null(3));
    assert_eq!(text_values(joined, "geoid20")[3].as_deref(), Some("53033999900"));
}

#[test]
fn test_statistical_projections_share_keys() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());
    let source = FixtureSource::seattle(&config.acs);

    let raw = load_inputs(&config, &source).unwrap();
    let output = transform(&raw, &config).unwrap();

    assert_eq!(output.acs_tabular.num_rows(), raw.statistical.num_rows());
    assert_eq!(output.acs_geometry.num_rows(), raw.statistical.num_rows());
    assert_eq!(output.acs_tabular.num_columns(), 15);
    assert_eq!(
        text_values(&output.acs_tabular, "acs_geoid20"),
        text_values(&output.acs_geometry, "acs_geoid20")
    );
}

#[test]
fn test_run_writes_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture_config(dir.path());
    let source = FixtureSource::seattle(&config.acs);

    run(&config, &source).unwrap();

    for stem in ["adu_data", "acs_data", "acs_geo", "adu_acs_data"] {
        let path = config.clean_dir().join(format!("{stem}.feather"));
        assert!(path.exists(), "missing {}", path.display());
    }
}

#[test]
fn test_missing_permit_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        data_dir: dir.path().to_path_buf(),
        ..PipelineConfig::default()
    };
    let source = FixtureSource::seattle(&config.acs);

    let err = load_inputs(&config, &source).unwrap_err();
    assert!(matches!(err, PipelineError::Io { .. }));
}

#[test]
fn test_schema_mismatch_can_abort() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture_config(dir.path());
    let source = FixtureSource::seattle(&config.acs);
    let mut raw = load_inputs(&config, &source).unwrap();

    let keep: Vec<usize> = (0..raw.detached.num_columns() - 1).collect();
    raw.detached = raw.detached.project(&keep).unwrap();

    config.fail_on_schema_mismatch = true;
    let err = transform(&raw, &config).unwrap_err();
    match err {
        PipelineError::SchemaMismatch(report) => assert!(report.has_missing_columns()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_configured_elapsed_times_are_derived() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture_config(dir.path());
    config.permits.elapsed_times = vec![ElapsedTime::new(
        "inspection_lag",
        "issued_date",
        "most_recent_inspection_date",
    )];
    let source = FixtureSource::seattle(&config.acs);

    let raw = load_inputs(&config, &source).unwrap();
    let output = transform(&raw, &config).unwrap();

    let lag = column::<Int64Array>(&output.permits, "inspection_lag");
    assert_eq!(lag.value(0), 12);
    assert!(output.permits.schema().index_of("processing_time").is_err());
}
