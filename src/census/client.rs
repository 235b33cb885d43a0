//! Blocking client for the Census Bureau ACS API and TIGERweb services.

use std::collections::BTreeSet;

use reqwest::blocking::Client;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::census::{StatisticalSource, TractRecord, build_extract_batch};
use crate::config::{AcsConfig, PlaceConfig};
use crate::error::{PipelineError, Result};
use crate::geometry::Geometry;
use arrow::record_batch::RecordBatch;

/// ACS data API root
pub const ACS_API_BASE: &str = "https://api.census.gov/data";
/// TIGERweb incorporated places layer
pub const TIGERWEB_PLACES: &str =
    "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/Places_CouSub_ConCity_SubMCD/MapServer/4/query";
/// TIGERweb census tracts layer
pub const TIGERWEB_TRACTS: &str =
    "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/Tracts_Blocks/MapServer/0/query";

/// Values at or below this are ACS annotation codes (e.g. -666666666), not estimates
const ANNOTATION_THRESHOLD: f64 = -99_999_999.0;

/// Bounding box in WGS84
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Fetches tract geometry from TIGERweb and estimates from the ACS 5-year API
pub struct CensusClient {
    client: Client,
    api_key: Option<String>,
}

impl Default for CensusClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CensusClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_key: None,
        }
    }

    /// Attach a Census API key (optional for small request volumes)
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        log::debug!("GET {url} {query:?}");
        let response = self.client.get(url).query(query).send()?.error_for_status()?;
        Ok(response.json::<Value>()?)
    }

    /// Boundary polygon of the named place
    pub fn place_boundary(&self, place: &PlaceConfig) -> Result<Geometry> {
        let body = self.get_json(
            TIGERWEB_PLACES,
            &[
                ("where", place_where_clause(place)),
                ("outFields", "GEOID,BASENAME,NAME".to_string()),
                ("returnGeometry", "true".to_string()),
                ("outSR", "4326".to_string()),
                ("f", "geojson".to_string()),
            ],
        )?;
        parse_place_boundary(&body)?.ok_or_else(|| {
            PipelineError::Census(format!("no boundary found for place {}", place.label()))
        })
    }

    /// Tracts intersecting an envelope, with locators and boundaries
    pub fn tracts_in(&self, envelope: Envelope) -> Result<Vec<TractRecord>> {
        let geometry = format!(
            "{},{},{},{}",
            envelope.xmin, envelope.ymin, envelope.xmax, envelope.ymax
        );
        let body = self.get_json(
            TIGERWEB_TRACTS,
            &[
                ("geometry", geometry),
                ("geometryType", "esriGeometryEnvelope".to_string()),
                ("inSR", "4326".to_string()),
                ("spatialRel", "esriSpatialRelIntersects".to_string()),
                ("outFields", "GEOID,STATE,COUNTY,TRACT".to_string()),
                ("outSR", "4326".to_string()),
                ("f", "geojson".to_string()),
            ],
        )?;
        parse_tract_features(&body)
    }

    /// ACS estimates for every tract of one county, keyed by GEOID
    pub fn county_estimates(
        &self,
        acs: &AcsConfig,
        state: &str,
        county: &str,
    ) -> Result<FxHashMap<String, Vec<Option<f64>>>> {
        let url = format!("{ACS_API_BASE}/{}/acs/acs5", acs.year);
        let mut query = vec![
            ("get", acs.codes().join(",")),
            ("for", "tract:*".to_string()),
            ("in", format!("state:{state} county:{county}")),
        ];
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }
        let body = self.get_json(&url, &query)?;
        parse_acs_table(&body, &acs.codes())
    }
}

impl StatisticalSource for CensusClient {
    fn fetch_tracts(&self, place: &PlaceConfig, acs: &AcsConfig) -> Result<RecordBatch> {
        let boundary = self.place_boundary(place)?;
        let envelope = Envelope::of(&boundary).ok_or_else(|| {
            PipelineError::Census(format!("empty boundary for place {}", place.label()))
        })?;
        log::info!("Boundary of {}: {envelope:?}", place.label());

        let candidates = self.tracts_in(envelope)?;
        let candidate_count = candidates.len();
        let tracts = select_place_tracts(candidates, &boundary, &place.state_fips);
        let counties: BTreeSet<String> = tracts.iter().map(|t| t.county.clone()).collect();
        log::info!(
            "{} of {candidate_count} candidate tracts lie in {}, across {} counties",
            tracts.len(),
            place.label(),
            counties.len()
        );

        let mut estimates = FxHashMap::default();
        for county in &counties {
            estimates.extend(self.county_estimates(acs, &place.state_fips, county)?);
        }

        let records = attach_estimates(tracts, &estimates, acs.variables.len());
        build_extract_batch(&records, acs)
    }
}

impl Envelope {
    /// Bounding box of a geometry
    #[must_use]
    pub fn of(geometry: &Geometry) -> Option<Self> {
        let (xmin, ymin, xmax, ymax) = geometry.bounding_box()?;
        Some(Self {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }
}

/// ArcGIS `where` clause selecting an incorporated place by its bare name.
///
/// `NAME` carries the legal suffix (`Seattle city`); `BASENAME` does not.
#[must_use]
pub fn place_where_clause(place: &PlaceConfig) -> String {
    format!(
        "BASENAME='{}' AND STATE='{}'",
        place.name.replace('\'', "''"),
        place.state_fips.replace('\'', "''")
    )
}

/// Keep the tracts of `state` whose interior point lies inside `boundary`.
///
/// Tracts only touching the place, or without geometry, are dropped.
#[must_use]
pub fn select_place_tracts(
    tracts: Vec<TractRecord>,
    boundary: &Geometry,
    state: &str,
) -> Vec<TractRecord> {
    tracts
        .into_iter()
        .filter(|tract| tract.state == state)
        .filter(|tract| {
            tract
                .geometry
                .as_ref()
                .and_then(Geometry::interior_point)
                .is_some_and(|(x, y)| boundary.contains_point(x, y))
        })
        .collect()
}

/// Fill each tract's values from the per-GEOID estimates; unknown tracts get nulls
#[must_use]
pub fn attach_estimates(
    tracts: Vec<TractRecord>,
    estimates: &FxHashMap<String, Vec<Option<f64>>>,
    variable_count: usize,
) -> Vec<TractRecord> {
    tracts
        .into_iter()
        .map(|mut tract| {
            match estimates.get(&tract.geoid) {
                Some(values) => tract.values.clone_from(values),
                None => {
                    log::warn!("No ACS estimates for tract {}", tract.geoid);
                    tract.values = vec![None; variable_count];
                }
            }
            tract
        })
        .collect()
}

/// Read the first feature's geometry of a GeoJSON place query
pub fn parse_place_boundary(body: &Value) -> Result<Option<Geometry>> {
    let Some(feature) = body
        .get("features")
        .and_then(Value::as_array)
        .and_then(|features| features.first())
    else {
        return Ok(None);
    };
    match feature.get("geometry") {
        Some(Value::Null) | None => Ok(None),
        Some(geometry) => Geometry::from_geojson(geometry).map(Some),
    }
}

/// Read a GeoJSON feature collection of tracts
pub fn parse_tract_features(body: &Value) -> Result<Vec<TractRecord>> {
    let features = body
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::Census("tract response has no features".to_string()))?;

    let mut records = Vec::with_capacity(features.len());
    for feature in features {
        let props = feature
            .get("properties")
            .ok_or_else(|| PipelineError::Census("tract feature without properties".to_string()))?;
        let prop = |key: &str| -> Result<String> {
            props
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| PipelineError::Census(format!("tract feature without {key}")))
        };

        let geometry = match feature.get("geometry") {
            Some(Value::Null) | None => None,
            Some(g) => Some(Geometry::from_geojson(g)?),
        };

        records.push(TractRecord {
            state: prop("STATE")?,
            county: prop("COUNTY")?,
            tract: prop("TRACT")?,
            geoid: prop("GEOID")?,
            values: Vec::new(),
            geometry,
        });
    }
    Ok(records)
}

/// Read an ACS API response (`[[header…], [row…], …]`) into values per GEOID
pub fn parse_acs_table(body: &Value, codes: &[&str]) -> Result<FxHashMap<String, Vec<Option<f64>>>> {
    let rows = body
        .as_array()
        .ok_or_else(|| PipelineError::Census("ACS response is not a table".to_string()))?;
    let (header, data) = rows
        .split_first()
        .ok_or_else(|| PipelineError::Census("ACS response is empty".to_string()))?;
    let header: Vec<&str> = header
        .as_array()
        .map(|h| h.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let position = |name: &str| {
        header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| PipelineError::Census(format!("ACS response has no '{name}' column")))
    };
    let state_idx = position("state")?;
    let county_idx = position("county")?;
    let tract_idx = position("tract")?;
    let code_idx = codes.iter().map(|c| position(c)).collect::<Result<Vec<_>>>()?;

    let mut out = FxHashMap::default();
    for row in data {
        let cells = row
            .as_array()
            .ok_or_else(|| PipelineError::Census("ACS row is not an array".to_string()))?;
        let cell = |i: usize| cells.get(i).and_then(Value::as_str).unwrap_or_default();
        let geoid = format!("{}{}{}", cell(state_idx), cell(county_idx), cell(tract_idx));
        let values = code_idx
            .iter()
            .map(|&i| {
                cell(i)
                    .parse::<f64>()
                    .ok()
                    .filter(|v| *v > ANNOTATION_THRESHOLD)
            })
            .collect();
        out.insert(geoid, values);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
            (x0, y0),
        ]])
    }

    fn tract(state: &str, tract: &str, geometry: Option<Geometry>) -> TractRecord {
        let record = TractRecord::new(state, "033", tract, Vec::new());
        match geometry {
            Some(g) => record.with_geometry(g),
            None => record,
        }
    }

    #[test]
    fn test_place_where_clause_uses_basename() {
        let place = PlaceConfig::default();
        assert_eq!(place_where_clause(&place), "BASENAME='Seattle' AND STATE='53'");

        let quoted = PlaceConfig {
            name: "Coeur d'Alene".to_string(),
            state_fips: "16".to_string(),
        };
        assert_eq!(
            place_where_clause(&quoted),
            "BASENAME='Coeur d''Alene' AND STATE='16'"
        );
    }

    #[test]
    fn test_parse_place_boundary() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"BASENAME": "Seattle", "NAME": "Seattle city"},
                "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 0.0]]]}
            }]
        });
        let boundary = parse_place_boundary(&body).unwrap().unwrap();
        assert_eq!(
            Envelope::of(&boundary),
            Some(Envelope {
                xmin: 0.0,
                ymin: 0.0,
                xmax: 4.0,
                ymax: 4.0
            })
        );
        let empty = json!({"type": "FeatureCollection", "features": []});
        assert_eq!(parse_place_boundary(&empty).unwrap(), None);
    }

    #[test]
    fn test_select_place_tracts_drops_neighbours() {
        let boundary = square(0.0, 0.0, 10.0);
        let tracts = vec![
            tract("53", "000100", Some(square(1.0, 1.0, 2.0))),
            // Straddles the boundary but mostly outside
            tract("53", "000200", Some(square(9.0, 1.0, 4.0))),
            tract("53", "000300", Some(square(20.0, 20.0, 2.0))),
            tract("41", "000400", Some(square(5.0, 5.0, 1.0))),
            tract("53", "000500", None),
        ];

        let selected = select_place_tracts(tracts, &boundary, "53");
        let geoids: Vec<&str> = selected.iter().map(|t| t.geoid.as_str()).collect();
        assert_eq!(geoids, vec!["53033000100"]);
    }

    #[test]
    fn test_attach_estimates_fills_missing_tracts() {
        let mut estimates = FxHashMap::default();
        estimates.insert("53033000100".to_string(), vec![Some(1.0), None]);
        let tracts = vec![tract("53", "000100", None), tract("53", "000200", None)];

        let records = attach_estimates(tracts, &estimates, 2);
        assert_eq!(records[0].values, vec![Some(1.0), None]);
        assert_eq!(records[1].values, vec![None, None]);
    }

    #[test]
    fn test_parse_acs_table_drops_annotations() {
        let body = json!([
            ["B19013_001E", "B11001_001E", "state", "county", "tract"],
            ["105000", "1200", "53", "033", "000100"],
            ["-666666666", null, "53", "033", "000200"]
        ]);
        let table = parse_acs_table(&body, &["B11001_001E", "B19013_001E"]).unwrap();
        assert_eq!(table["53033000100"], vec![Some(1200.0), Some(105_000.0)]);
        assert_eq!(table["53033000200"], vec![None, None]);
    }

    #[test]
    fn test_parse_acs_table_missing_code() {
        let body = json!([["B19013_001E", "state", "county", "tract"]]);
        assert!(parse_acs_table(&body, &["B11001_001E"]).is_err());
    }

    #[test]
    fn test_parse_tract_features() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"GEOID": "53033000100", "STATE": "53", "COUNTY": "033", "TRACT": "000100"},
                "geometry": {"type": "Polygon", "coordinates": [[[-122.3, 47.6], [-122.2, 47.6], [-122.3, 47.6]]]}
            }]
        });
        let tracts = parse_tract_features(&body).unwrap();
        assert_eq!(tracts.len(), 1);
        assert_eq!(tracts[0].geoid, "53033000100");
        assert!(matches!(tracts[0].geometry, Some(Geometry::Polygon(_))));
    }
}
