//! Tract-level statistical extracts.
//!
//! A [`StatisticalSource`] turns a place and a list of ACS variable codes
//! into one raw table with the layout
//! `state, county, tract, GEOID, <codes…>, geometry`.

pub mod client;

use std::sync::Arc;

use arrow::array::{ArrayRef, BinaryBuilder, Float64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::config::{AcsConfig, PlaceConfig};
use crate::error::{PipelineError, Result};
use crate::geometry::{EPSG_4326, Geometry, geometry_field};

pub use client::CensusClient;

/// Anything that can produce the raw statistical extract for a place
pub trait StatisticalSource {
    /// Fetch one row per tract of `place` with the configured variables
    fn fetch_tracts(&self, place: &PlaceConfig, acs: &AcsConfig) -> Result<RecordBatch>;
}

/// One tract of a raw extract, before it becomes a table row
#[derive(Debug, Clone, PartialEq)]
pub struct TractRecord {
    pub state: String,
    pub county: String,
    pub tract: String,
    /// State + county + tract, 11 characters
    pub geoid: String,
    /// Values in the order of the requested codes; `None` when suppressed
    pub values: Vec<Option<f64>>,
    pub geometry: Option<Geometry>,
}

impl TractRecord {
    /// Build a record whose GEOID is the concatenation of its locators
    #[must_use]
    pub fn new(state: &str, county: &str, tract: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            state: state.to_string(),
            county: county.to_string(),
            tract: tract.to_string(),
            geoid: format!("{state}{county}{tract}"),
            values,
            geometry: None,
        }
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }
}

/// Lay out tract records as a raw extract table
pub fn build_extract_batch(records: &[TractRecord], acs: &AcsConfig) -> Result<RecordBatch> {
    let codes = acs.codes();
    let mut fields = Vec::with_capacity(codes.len() + 5);
    for locator in &acs.locator_columns {
        fields.push(Field::new(locator, DataType::Utf8, true));
    }
    fields.push(Field::new(&acs.geoid_column, DataType::Utf8, true));

    let mut locators: Vec<StringBuilder> = acs.locator_columns.iter().map(|_| StringBuilder::new()).collect();
    let mut geoids = StringBuilder::new();
    let mut values: Vec<Float64Builder> = codes.iter().map(|_| Float64Builder::new()).collect();
    let mut geometries = BinaryBuilder::new();

    for record in records {
        if record.values.len() != codes.len() {
            return Err(PipelineError::Census(format!(
                "tract {} has {} values for {} variables",
                record.geoid,
                record.values.len(),
                codes.len()
            )));
        }
        let parts = [&record.state, &record.county, &record.tract];
        for (builder, part) in locators.iter_mut().zip(parts) {
            builder.append_value(part);
        }
        geoids.append_value(&record.geoid);
        for (builder, value) in values.iter_mut().zip(&record.values) {
            builder.append_option(*value);
        }
        match &record.geometry {
            Some(geometry) => geometries.append_value(geometry.to_wkb()),
            None => geometries.append_null(),
        }
    }

    let mut columns: Vec<ArrayRef> = locators
        .iter_mut()
        .map(|b| Arc::new(b.finish()) as ArrayRef)
        .collect();
    columns.push(Arc::new(geoids.finish()));
    for (code, mut builder) in codes.iter().zip(values) {
        fields.push(Field::new(*code, DataType::Float64, true));
        columns.push(Arc::new(builder.finish()));
    }
    fields.push(geometry_field(&acs.geometry_column, EPSG_4326));
    columns.push(Arc::new(geometries.finish()));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_extract_layout() {
        let mut acs = AcsConfig::default();
        acs.variables.truncate(2);
        let records = vec![
            TractRecord::new("53", "033", "000100", vec![Some(10.0), None]),
            TractRecord::new("53", "033", "000200", vec![Some(5.0), Some(1.0)])
                .with_geometry(Geometry::Polygon(vec![vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]])),
        ];

        let batch = build_extract_batch(&records, &acs).unwrap();
        let names: Vec<_> = batch.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(
            names,
            vec!["state", "county", "tract", "GEOID", "B11001_001E", "B11001_002E", "geometry"]
        );
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.column(5).null_count(), 1);
        assert_eq!(batch.column(6).null_count(), 1);
    }

    #[test]
    fn test_value_count_mismatch() {
        let acs = AcsConfig::default();
        let records = vec![TractRecord::new("53", "033", "000100", vec![Some(1.0)])];
        assert!(matches!(
            build_extract_batch(&records, &acs),
            Err(PipelineError::Census(_))
        ));
    }
}
