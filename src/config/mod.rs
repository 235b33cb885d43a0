//! Configuration for the ADU/ACS pipeline.
//!
//! Every dictionary and column enumeration the cleaning stages need lives
//! here and is passed to them explicitly, so alternate schemas can be tested
//! without touching the stages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::schema::adapt::DateFormatConfig;

/// Pinned ACS 5-year variable codes and their human-readable labels
pub const ACS_VARIABLES: [(&str, &str); 14] = [
    ("B11001_001E", "Total HH"),
    ("B11001_002E", "Family HH"),
    ("B11017_002E", "Multigen HH"),
    ("B25001_001E", "Total Units"),
    ("B25002_003E", "Total Vac Units"),
    ("B25003_002E", "Total Owner Occupied Units"),
    ("B25018_001E", "Median Rooms"),
    ("B25024_002E", "Units DADU"),
    ("B25024_003E", "Units AADU"),
    ("B25027_002E", "Units Mortgage"),
    ("B25035_001E", "Median Year Built"),
    ("B19061_001E", "Agg HH Income"),
    ("B19013_001E", "Median HH Income"),
    ("B19083_001E", "Gini Income Ineq"),
];

/// Permit columns retained by the cleaner, in output order
pub const PERMIT_COLUMNS: [&str; 18] = [
    "Type of Dwelling Unit",
    "Development Site Square Feet",
    "Permit Value",
    "Description of Work",
    "New Units Permitted",
    "Demolished Units Permitted",
    "Net Units Permitted",
    "Sleeping Rooms Permitted",
    "Application Date",
    "Issued Date",
    "Final Date",
    "Most Recent Inspection Date",
    "Project Address",
    "Neighborhood",
    "Council District",
    "GEOID20",
    "Longitude",
    "Latitude",
];

/// Columnar format of the persisted artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Arrow IPC file format (Feather v2)
    Feather,
    /// Apache Parquet
    Parquet,
}

impl OutputFormat {
    /// File extension used for artifacts of this format
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Feather => "feather",
            Self::Parquet => "parquet",
        }
    }

    /// Guess the format from a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "feather" | "arrow" | "ipc" => Some(Self::Feather),
            "parquet" => Some(Self::Parquet),
            _ => None,
        }
    }
}

/// The named place whose tracts are fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceConfig {
    /// Place name as registered with the Census Bureau
    pub name: String,
    /// Two-digit state FIPS code
    pub state_fips: String,
}

impl Default for PlaceConfig {
    fn default() -> Self {
        Self {
            name: "Seattle".to_string(),
            state_fips: "53".to_string(),
        }
    }
}

impl PlaceConfig {
    /// Human label such as `Seattle (state 53)`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} (state {})", self.name, self.state_fips)
    }
}

/// One requested ACS variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcsVariable {
    /// Machine code, e.g. `B19013_001E`
    pub code: String,
    /// Human label, e.g. `Median HH Income`
    pub label: String,
}

/// An elapsed-time feature `name = to - from`, in whole days
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElapsedTime {
    pub name: String,
    /// Starting milestone date column
    pub from: String,
    /// Ending milestone date column
    pub to: String,
}

impl ElapsedTime {
    #[must_use]
    pub fn new(name: &str, from: &str, to: &str) -> Self {
        Self {
            name: name.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// `processing_time` (application to issue) and `build_time` (issue to final)
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("processing_time", "application_date", "issued_date"),
            Self::new("build_time", "issued_date", "final_date"),
        ]
    }
}

/// How the statistical extract is requested and cleaned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcsConfig {
    /// Final year of the ACS 5-year release
    pub year: u16,
    /// Namespace marker prepended to every cleaned column
    pub prefix: String,
    /// Join key name shared with the permit table (before prefixing)
    pub key_column: String,
    /// Combined geographic identifier column of the raw extract
    pub geoid_column: String,
    /// Hierarchical locator columns dropped after the GEOID is available
    pub locator_columns: Vec<String>,
    /// Geometry column of the raw extract
    pub geometry_column: String,
    /// Requested variables
    pub variables: Vec<AcsVariable>,
}

impl Default for AcsConfig {
    fn default() -> Self {
        Self {
            year: 2022,
            prefix: "acs_".to_string(),
            key_column: "geoid20".to_string(),
            geoid_column: "GEOID".to_string(),
            locator_columns: vec![
                "state".to_string(),
                "county".to_string(),
                "tract".to_string(),
            ],
            geometry_column: "geometry".to_string(),
            variables: ACS_VARIABLES
                .iter()
                .map(|(code, label)| AcsVariable {
                    code: (*code).to_string(),
                    label: (*label).to_string(),
                })
                .collect(),
        }
    }
}

impl AcsConfig {
    /// Variable codes in request order
    #[must_use]
    pub fn codes(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.code.as_str()).collect()
    }

    /// Prefixed name of the join key, e.g. `acs_geoid20`
    #[must_use]
    pub fn prefixed_key(&self) -> String {
        format!("{}{}", self.prefix, self.key_column)
    }

    /// Prefixed name of the geometry column, e.g. `acs_geometry`
    #[must_use]
    pub fn prefixed_geometry(&self) -> String {
        format!("{}{}", self.prefix, self.geometry_column.to_lowercase())
    }
}

/// Column enumerations and dictionaries used by the permit cleaner.
///
/// Column names other than `columns` refer to normalized names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PermitCleaningConfig {
    /// Raw column names to keep, in order
    pub columns: Vec<String>,
    /// Columns parsed into dates
    pub date_columns: Vec<String>,
    /// Columns coerced into categories
    pub categorical_columns: Vec<String>,
    /// Columns coerced into nullable integers
    pub integer_columns: Vec<String>,
    /// Category renames as (column, from, to)
    pub category_renames: Vec<(String, String, String)>,
    /// Block-level geographic code, truncated into the tract key
    pub geoid_column: String,
    /// Width of the raw geographic code
    pub source_geoid_width: usize,
    /// Width of the derived tract key
    pub tract_key_width: usize,
    pub longitude_column: String,
    pub latitude_column: String,
    /// Name of the derived point geometry column
    pub geometry_column: String,
    /// Elapsed-time features derived from the parsed dates
    pub elapsed_times: Vec<ElapsedTime>,
}

impl Default for PermitCleaningConfig {
    fn default() -> Self {
        let owned = |names: &[&str]| names.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        Self {
            columns: owned(&PERMIT_COLUMNS),
            date_columns: owned(&[
                "application_date",
                "issued_date",
                "final_date",
                "most_recent_inspection_date",
            ]),
            categorical_columns: owned(&[
                "type_of_dwelling_unit",
                "neighborhood",
                "council_district",
            ]),
            integer_columns: owned(&["demolished_units_permitted", "net_units_permitted"]),
            category_renames: vec![(
                "type_of_dwelling_unit".to_string(),
                "ADU".to_string(),
                "AADU".to_string(),
            )],
            geoid_column: "geoid20".to_string(),
            source_geoid_width: 15,
            tract_key_width: 11,
            longitude_column: "longitude".to_string(),
            latitude_column: "latitude".to_string(),
            geometry_column: "geometry".to_string(),
            elapsed_times: ElapsedTime::defaults(),
        }
    }
}

/// Configuration for a full pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory holding `raw/` and `clean/`
    pub data_dir: PathBuf,
    /// Attached-unit permit extract, relative to `raw/`
    pub attached_permits_file: String,
    /// Detached-unit permit extract, relative to `raw/`
    pub detached_permits_file: String,
    pub place: PlaceConfig,
    pub acs: AcsConfig,
    pub permits: PermitCleaningConfig,
    /// Date format configuration for string-to-date conversions
    pub date_formats: DateFormatConfig,
    pub output_format: OutputFormat,
    /// Abort when the two permit sources disagree on their schema
    pub fail_on_schema_mismatch: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            attached_permits_file: "Attached_Accessory_Dwelling_Units_(AADUs).csv".to_string(),
            detached_permits_file: "Detached_Accessory_Dwelling_Units_(DADUs).csv".to_string(),
            place: PlaceConfig::default(),
            acs: AcsConfig::default(),
            permits: PermitCleaningConfig::default(),
            date_formats: DateFormatConfig::default(),
            output_format: OutputFormat::Feather,
            fail_on_schema_mismatch: false,
        }
    }
}

impl PipelineConfig {
    /// Name of the optional override file inside `data_dir`
    pub const FILE_NAME: &'static str = "pipeline.json";

    /// Load a configuration from a JSON file; absent keys take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the cleaning stages cannot work with
    pub fn validate(&self) -> Result<()> {
        let permits = &self.permits;
        if permits.tract_key_width == 0 || permits.tract_key_width > permits.source_geoid_width {
            return Err(PipelineError::Config(format!(
                "tract key width {} must be between 1 and the source width {}",
                permits.tract_key_width, permits.source_geoid_width
            )));
        }
        for feature in &permits.elapsed_times {
            for column in [&feature.from, &feature.to] {
                if !permits.date_columns.contains(column) {
                    return Err(PipelineError::Config(format!(
                        "elapsed time '{}' uses '{column}', which is not a date column",
                        feature.name
                    )));
                }
            }
        }
        if self.acs.variables.is_empty() {
            return Err(PipelineError::Config("no ACS variables configured".to_string()));
        }
        let mut labels: Vec<&str> = self.acs.variables.iter().map(|v| v.label.as_str()).collect();
        labels.sort_unstable();
        if labels.windows(2).any(|w| w[0] == w[1]) {
            return Err(PipelineError::Config("ACS variable labels must be unique".to_string()));
        }
        Ok(())
    }

    /// Directory of the raw inputs
    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    /// Directory of the cleaned outputs
    #[must_use]
    pub fn clean_dir(&self) -> PathBuf {
        self.data_dir.join("clean")
    }

    #[must_use]
    pub fn attached_permits_path(&self) -> PathBuf {
        self.raw_dir().join(&self.attached_permits_file)
    }

    #[must_use]
    pub fn detached_permits_path(&self) -> PathBuf {
        self.raw_dir().join(&self.detached_permits_file)
    }

    /// Output path of an artifact, e.g. `data/clean/adu_data.feather`
    #[must_use]
    pub fn output_path(&self, stem: &str) -> PathBuf {
        self.clean_dir()
            .join(format!("{stem}.{}", self.output_format.extension()))
    }
}
