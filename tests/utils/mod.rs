use std::fs;
use std::path::Path;

use adu_pipeline::geometry::Geometry;
use adu_pipeline::{
    AcsConfig, PipelineConfig, PlaceConfig, RecordBatch, Result, StatisticalSource, TractRecord,
    build_extract_batch,
};

/// Header shared by both permit fixtures
pub const PERMIT_HEADER: &str = "Type of Dwelling Unit,Development Site Square Feet,Permit Value,\
Description of Work,New Units Permitted,Demolished Units Permitted,Net Units Permitted,\
Sleeping Rooms Permitted,Application Date,Issued Date,Final Date,Most Recent Inspection Date,\
Project Address,Neighborhood,Council District,GEOID20,Longitude,Latitude";

/// Attached-unit permits; the first row is the reference scenario
pub const ATTACHED_ROWS: [&str; 2] = [
    "ADU,5000,85000,\"Convert basement, add kitchen\",1,0,1,1,01/10/2023 10:00:00 AM,01/20/2023,\
02/05/2023,02/01/2023,123 Main St,Ballard,6,530330001001001,-122.33,47.61",
    "ADU,4200,60000,Attic conversion,1,0,1,2,03/01/2023 09:15:00 AM,02/20/2023,04/01/2023,\
03/30/2023,9 Pine St,Fremont,4,530330002002003,-122.35,47.65",
];

/// Detached-unit permits; the second row lies in a tract with no estimates
pub const DETACHED_ROWS: [&str; 2] = [
    "DADU,6100,190000,New backyard cottage,1,0,1,2,01/05/2023,02/15/2023,06/30/2023,06/01/2023,\
77 Oak Ave,Ballard,6,530330001001002,-122.34,47.62",
    "DADU,7300,240000,Garage conversion,1,1,0,1,11/12/2022,01/03/2023,05/15/2023,05/02/2023,\
5 Elm Way,Rainier Valley,2,530339999001001,-122.28,47.55",
];

/// Write a CSV fixture with the permit header
pub fn write_permit_csv(path: &Path, rows: &[&str]) {
    let mut text = String::from(PERMIT_HEADER);
    for row in rows {
        text.push('\n');
        text.push_str(row);
    }
    text.push('\n');
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

/// A configuration rooted at `data_dir` with both fixtures written under `raw/`
pub fn fixture_config(data_dir: &Path) -> PipelineConfig {
    let config = PipelineConfig {
        data_dir: data_dir.to_path_buf(),
        ..PipelineConfig::default()
    };
    write_permit_csv(&config.attached_permits_path(), &ATTACHED_ROWS);
    write_permit_csv(&config.detached_permits_path(), &DETACHED_ROWS);
    config
}

fn square(x: f64, y: f64) -> Geometry {
    Geometry::Polygon(vec![vec![
        (x, y),
        (x + 0.01, y),
        (x + 0.01, y + 0.01),
        (x, y + 0.01),
        (x, y),
    ]])
}

/// A statistical source answering from memory
#[derive(Debug, Clone)]
pub struct FixtureSource {
    pub records: Vec<TractRecord>,
}

impl FixtureSource {
    /// Two tracts: `53033000100` and `53033000200`
    #[must_use]
    pub fn seattle(acs: &AcsConfig) -> Self {
        let values = |base: f64| {
            (0..acs.variables.len())
                .map(|i| Some(base + i as f64))
                .collect::<Vec<_>>()
        };
        let mut second = values(200.0);
        second[1] = None;
        Self {
            records: vec![
                TractRecord::new("53", "033", "000100", values(100.0))
                    .with_geometry(square(-122.34, 47.60)),
                TractRecord::new("53", "033", "000200", second)
                    .with_geometry(square(-122.36, 47.64)),
            ],
        }
    }
}

impl StatisticalSource for FixtureSource {
    fn fetch_tracts(&self, _place: &PlaceConfig, acs: &AcsConfig) -> Result<RecordBatch> {
        build_extract_batch(&self.records, acs)
    }
}
