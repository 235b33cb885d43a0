//! Minimal vector geometry for permit points and tract polygons.
//!
//! Geometries are stored in Arrow as `Binary` columns of ISO WKB, tagged with
//! the GeoArrow extension name and a CRS in the field metadata, which is how
//! geospatial dataframes lay out geometry in Feather files.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, BinaryArray, BinaryBuilder, Float64Array};
use arrow::datatypes::{DataType, Field};
use serde_json::Value;

use crate::error::{PipelineError, Result};

/// Geographic coordinates (longitude/latitude on WGS84)
pub const EPSG_4326: &str = "EPSG:4326";

const WKB_POINT: u32 = 1;
const WKB_POLYGON: u32 = 3;
const WKB_MULTIPOLYGON: u32 = 6;
const LITTLE_ENDIAN: u8 = 1;

/// A closed ring of `(x, y)` coordinates
pub type Ring = Vec<(f64, f64)>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point { x: f64, y: f64 },
    /// Exterior ring first, then holes
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Encode as little-endian ISO WKB
    #[must_use]
    pub fn to_wkb(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_geometry(self, &mut out);
        out
    }

    /// Decode ISO WKB (either byte order)
    pub fn from_wkb(bytes: &[u8]) -> Result<Self> {
        let mut reader = WkbReader { bytes, pos: 0 };
        let geometry = reader.geometry()?;
        if reader.pos != bytes.len() {
            return Err(PipelineError::Geometry(format!(
                "{} trailing bytes after geometry",
                bytes.len() - reader.pos
            )));
        }
        Ok(geometry)
    }

    /// Parse a GeoJSON geometry object (`Point`, `Polygon` or `MultiPolygon`)
    pub fn from_geojson(value: &Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| PipelineError::Geometry("GeoJSON geometry without type".to_string()))?;
        let coordinates = value
            .get("coordinates")
            .ok_or_else(|| PipelineError::Geometry(format!("{kind} without coordinates")))?;

        match kind {
            "Point" => {
                let (x, y) = position(coordinates)?;
                Ok(Self::Point { x, y })
            }
            "Polygon" => Ok(Self::Polygon(rings(coordinates)?)),
            "MultiPolygon" => {
                let polygons = as_array(coordinates)?
                    .iter()
                    .map(rings)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::MultiPolygon(polygons))
            }
            other => Err(PipelineError::Geometry(format!(
                "unsupported GeoJSON geometry type '{other}'"
            ))),
        }
    }

    /// Polygons of an areal geometry, each as exterior ring then holes
    fn polygons(&self) -> Vec<&[Ring]> {
        match self {
            Self::Point { .. } => Vec::new(),
            Self::Polygon(rings) => vec![rings.as_slice()],
            Self::MultiPolygon(polygons) => polygons.iter().map(Vec::as_slice).collect(),
        }
    }

    /// Bounding box as `(xmin, ymin, xmax, ymax)`; `None` when there are no coordinates
    #[must_use]
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        let coords: Vec<(f64, f64)> = match self {
            Self::Point { x, y } => vec![(*x, *y)],
            _ => self
                .polygons()
                .into_iter()
                .flatten()
                .flatten()
                .copied()
                .collect(),
        };
        let (&(x0, y0), rest) = coords.split_first()?;
        Some(rest.iter().fold((x0, y0, x0, y0), |(xmin, ymin, xmax, ymax), &(x, y)| {
            (xmin.min(x), ymin.min(y), xmax.max(x), ymax.max(y))
        }))
    }

    /// Whether `(x, y)` lies inside the polygon area (even-odd rule, holes excluded)
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.polygons()
            .into_iter()
            .any(|rings| rings.iter().filter(|ring| ring_crosses(ring, x, y)).count() % 2 == 1)
    }

    /// A point guaranteed to lie inside the largest polygon.
    ///
    /// A horizontal line through the middle of the polygon's bounding box is
    /// cut by every ring edge; the midpoint of the widest inside span is used.
    #[must_use]
    pub fn interior_point(&self) -> Option<(f64, f64)> {
        let rings = self
            .polygons()
            .into_iter()
            .max_by(|a, b| exterior_area(a).total_cmp(&exterior_area(b)))?;
        let exterior = rings.first()?;
        let (ymin, ymax) = exterior
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
        let y = (ymin + ymax) / 2.0;

        let mut crossings: Vec<f64> = rings
            .iter()
            .flat_map(|ring| ring.windows(2))
            .filter(|edge| (edge[0].1 > y) != (edge[1].1 > y))
            .map(|edge| {
                let ((x1, y1), (x2, y2)) = (edge[0], edge[1]);
                x1 + (y - y1) * (x2 - x1) / (y2 - y1)
            })
            .collect();
        crossings.sort_by(f64::total_cmp);

        crossings
            .chunks_exact(2)
            .max_by(|a, b| (a[1] - a[0]).total_cmp(&(b[1] - b[0])))
            .map(|span| ((span[0] + span[1]) / 2.0, y))
    }
}

/// Ray cast to the right of `(x, y)`: does it cross `ring` an odd number of times
fn ring_crosses(ring: &Ring, x: f64, y: f64) -> bool {
    let mut inside = false;
    for edge in ring.windows(2) {
        let ((x1, y1), (x2, y2)) = (edge[0], edge[1]);
        if (y1 > y) != (y2 > y) && x < x1 + (y - y1) * (x2 - x1) / (y2 - y1) {
            inside = !inside;
        }
    }
    inside
}

fn exterior_area(rings: &[Ring]) -> f64 {
    rings.first().map_or(0.0, |ring| {
        ring.windows(2)
            .map(|e| e[0].0 * e[1].1 - e[1].0 * e[0].1)
            .sum::<f64>()
            .abs()
            / 2.0
    })
}

fn as_array(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| PipelineError::Geometry(format!("expected coordinate array, got {value}")))
}

fn position(value: &Value) -> Result<(f64, f64)> {
    let coords = as_array(value)?;
    match (
        coords.first().and_then(Value::as_f64),
        coords.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(PipelineError::Geometry(format!("invalid position {value}"))),
    }
}

fn rings(value: &Value) -> Result<Vec<Ring>> {
    let mut out = Vec::new();
    for ring in as_array(value)? {
        out.push(as_array(ring)?.iter().map(position).collect::<Result<Ring>>()?);
    }
    Ok(out)
}

fn write_u32(value: u32, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_len(len: usize, out: &mut Vec<u8>) {
    // WKB counts are u32; tract rings are far below that
    write_u32(u32::try_from(len).unwrap_or(u32::MAX), out);
}

fn write_rings(rings: &[Ring], out: &mut Vec<u8>) {
    write_len(rings.len(), out);
    for ring in rings {
        write_len(ring.len(), out);
        for (x, y) in ring {
            out.extend_from_slice(&x.to_le_bytes());
            out.extend_from_slice(&y.to_le_bytes());
        }
    }
}

fn write_geometry(geometry: &Geometry, out: &mut Vec<u8>) {
    out.push(LITTLE_ENDIAN);
    match geometry {
        Geometry::Point { x, y } => {
            write_u32(WKB_POINT, out);
            out.extend_from_slice(&x.to_le_bytes());
            out.extend_from_slice(&y.to_le_bytes());
        }
        Geometry::Polygon(rings) => {
            write_u32(WKB_POLYGON, out);
            write_rings(rings, out);
        }
        Geometry::MultiPolygon(polygons) => {
            write_u32(WKB_MULTIPOLYGON, out);
            write_len(polygons.len(), out);
            for polygon in polygons {
                write_geometry(&Geometry::Polygon(polygon.clone()), out);
            }
        }
    }
}

struct WkbReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl WkbReader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| PipelineError::Geometry("truncated WKB".to_string()))?;
        self.pos = end;
        let mut buf = [0u8; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }

    fn u32(&mut self, little: bool) -> Result<u32> {
        let raw = self.take::<4>()?;
        Ok(if little { u32::from_le_bytes(raw) } else { u32::from_be_bytes(raw) })
    }

    fn f64(&mut self, little: bool) -> Result<f64> {
        let raw = self.take::<8>()?;
        Ok(if little { f64::from_le_bytes(raw) } else { f64::from_be_bytes(raw) })
    }

    fn rings(&mut self, little: bool) -> Result<Vec<Ring>> {
        let count = self.u32(little)?;
        let mut rings = Vec::new();
        for _ in 0..count {
            let points = self.u32(little)?;
            let mut ring = Ring::new();
            for _ in 0..points {
                ring.push((self.f64(little)?, self.f64(little)?));
            }
            rings.push(ring);
        }
        Ok(rings)
    }

    fn geometry(&mut self) -> Result<Geometry> {
        let [order] = self.take::<1>()?;
        let little = order == LITTLE_ENDIAN;
        match self.u32(little)? {
            WKB_POINT => Ok(Geometry::Point {
                x: self.f64(little)?,
                y: self.f64(little)?,
            }),
            WKB_POLYGON => Ok(Geometry::Polygon(self.rings(little)?)),
            WKB_MULTIPOLYGON => {
                let count = self.u32(little)?;
                let mut polygons = Vec::new();
                for _ in 0..count {
                    match self.geometry()? {
                        Geometry::Polygon(rings) => polygons.push(rings),
                        other => {
                            return Err(PipelineError::Geometry(format!(
                                "multipolygon member is not a polygon: {other:?}"
                            )));
                        }
                    }
                }
                Ok(Geometry::MultiPolygon(polygons))
            }
            other => Err(PipelineError::Geometry(format!("unsupported WKB type {other}"))),
        }
    }
}

/// Arrow field for a WKB geometry column in the given CRS
#[must_use]
pub fn geometry_field(name: &str, crs: &str) -> Field {
    Field::new(name, DataType::Binary, true).with_metadata(HashMap::from([
        ("ARROW:extension:name".to_string(), "geoarrow.wkb".to_string()),
        ("crs".to_string(), crs.to_string()),
    ]))
}

/// Build a WKB point column from coordinate columns.
///
/// A row with a missing (or NaN) coordinate gets a null geometry.
#[must_use]
pub fn points_from_xy(longitude: &Float64Array, latitude: &Float64Array) -> ArrayRef {
    let mut builder = BinaryBuilder::with_capacity(longitude.len(), longitude.len() * 21);
    for (x, y) in longitude.iter().zip(latitude.iter()) {
        match (x, y) {
            (Some(x), Some(y)) if !x.is_nan() && !y.is_nan() => {
                builder.append_value(Geometry::Point { x, y }.to_wkb());
            }
            _ => builder.append_null(),
        }
    }
    Arc::new(builder.finish())
}

/// Decode every non-null value of a WKB column
pub fn decode_column(array: &BinaryArray) -> Result<Vec<Option<Geometry>>> {
    array
        .iter()
        .map(|value| value.map(Geometry::from_wkb).transpose())
        .collect()
}
