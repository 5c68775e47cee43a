//! Minimal GeoJSON boundary reader
//!
//! Reads a FeatureCollection of Polygon / MultiPolygon features such as the
//! Natural Earth admin-0 countries export. Other geometry types are skipped.

use super::{AttributeValue, Boundary, BoundarySource};
use crate::error::{Error, Result};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Property keys tried, in order, for the feature name
const NAME_KEYS: [&str; 4] = ["name", "NAME", "ADMIN", "admin"];

/// GeoJSON file on disk
#[derive(Debug, Clone)]
pub struct GeoJsonBoundaries {
    path: PathBuf,
}

impl GeoJsonBoundaries {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Parse boundaries from a GeoJSON string
    pub fn parse(text: &str) -> Result<Vec<Boundary>> {
        let root: Value = serde_json::from_str(text)?;

        let features = match root.get("type").and_then(Value::as_str) {
            Some("FeatureCollection") => root
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::Parse("FeatureCollection without features".into()))?
                .iter()
                .collect::<Vec<_>>(),
            Some("Feature") => vec![&root],
            other => {
                return Err(Error::Parse(format!(
                    "expected FeatureCollection or Feature, got {:?}",
                    other
                )))
            }
        };

        let mut boundaries = Vec::with_capacity(features.len());
        for (idx, feature) in features.into_iter().enumerate() {
            let properties = feature
                .get("properties")
                .and_then(Value::as_object)
                .map(parse_properties)
                .unwrap_or_default();

            let name = NAME_KEYS
                .iter()
                .find_map(|k| match properties.get(*k) {
                    Some(AttributeValue::String(s)) => Some(s.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| format!("feature-{}", idx));

            let Some(footprint) = feature.get("geometry").map(parse_geometry).transpose()? else {
                debug!("Skipping feature {} ({}): no geometry", idx, name);
                continue;
            };
            let Some(footprint) = footprint else {
                debug!("Skipping feature {} ({}): not a polygon", idx, name);
                continue;
            };

            boundaries.push(Boundary {
                name,
                footprint,
                properties,
            });
        }

        Ok(boundaries)
    }
}

impl BoundarySource for GeoJsonBoundaries {
    fn boundaries(&self) -> Result<Vec<Boundary>> {
        let text = std::fs::read_to_string(&self.path)?;
        let boundaries = Self::parse(&text)?;
        debug!("Loaded {} boundaries from {}", boundaries.len(), self.path.display());
        Ok(boundaries)
    }
}

fn parse_properties(props: &Map<String, Value>) -> HashMap<String, AttributeValue> {
    props
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::Null => AttributeValue::Null,
                Value::Bool(b) => AttributeValue::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => AttributeValue::Int(i),
                    None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
                },
                Value::String(s) => AttributeValue::String(s.clone()),
                other => AttributeValue::String(other.to_string()),
            };
            (k.clone(), value)
        })
        .collect()
}

/// `Ok(None)` for null or non-polygonal geometries
fn parse_geometry(geometry: &Value) -> Result<Option<MultiPolygon<f64>>> {
    if geometry.is_null() {
        return Ok(None);
    }
    let coords = geometry.get("coordinates");

    match geometry.get("type").and_then(Value::as_str) {
        Some("Polygon") => {
            let rings = coords.ok_or_else(|| Error::Parse("Polygon without coordinates".into()))?;
            Ok(Some(MultiPolygon::new(vec![parse_polygon(rings)?])))
        }
        Some("MultiPolygon") => {
            let polys = coords
                .and_then(Value::as_array)
                .ok_or_else(|| Error::Parse("MultiPolygon without coordinates".into()))?;
            let polygons = polys.iter().map(parse_polygon).collect::<Result<Vec<_>>>()?;
            Ok(Some(MultiPolygon::new(polygons)))
        }
        _ => Ok(None),
    }
}

fn parse_polygon(rings: &Value) -> Result<Polygon<f64>> {
    let rings = rings
        .as_array()
        .ok_or_else(|| Error::Parse("polygon rings must be an array".into()))?;
    let mut rings = rings.iter().map(parse_ring);

    let exterior = rings
        .next()
        .ok_or_else(|| Error::Parse("polygon without exterior ring".into()))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

fn parse_ring(ring: &Value) -> Result<LineString<f64>> {
    let points = ring
        .as_array()
        .ok_or_else(|| Error::Parse("ring must be an array of positions".into()))?;

    points
        .iter()
        .map(|p| {
            let x = p.get(0).and_then(Value::as_f64);
            let y = p.get(1).and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(Error::Parse(format!("invalid position: {}", p))),
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}
