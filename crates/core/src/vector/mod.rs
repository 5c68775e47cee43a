//! Boundary features: named polygons with attributes
//!
//! Boundaries come from an external [`BoundarySource`]. The analysis only
//! reads their envelope, their footprint and the GDP attribute.

mod geojson;

use crate::error::{Error, Result};
use geo::{BoundingRect, Contains};
use geo_types::{MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use geojson::GeoJsonBoundaries;

/// Attribute name carrying the GDP estimate (millions of USD)
pub const GDP_ATTRIBUTE: &str = "gdp_md_est";

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Numeric view of the attribute, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) if f.is_finite() => Some(*f),
            AttributeValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Axis-aligned bounding envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Envelope from a (min_x, min_y, max_x, max_y) tuple
    pub fn from_bounds(bounds: (f64, f64, f64, f64)) -> Self {
        Self::new(bounds.0, bounds.1, bounds.2, bounds.3)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Corner coordinates, counter-clockwise from (min_x, min_y)
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
        ]
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// A named boundary (typically a country) with attributes
#[derive(Debug, Clone)]
pub struct Boundary {
    /// Display name used for lookups
    pub name: String,
    /// Footprint; islands and exclaves are separate polygons
    pub footprint: MultiPolygon<f64>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
}

impl Boundary {
    /// Boundary from a single polygon
    pub fn new(name: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self::from_multi(name, MultiPolygon::new(vec![polygon]))
    }

    /// Boundary from a multi-polygon footprint
    pub fn from_multi(name: impl Into<String>, footprint: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            footprint,
            properties: HashMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Numeric attribute, with missing or non-numeric values read as 0
    pub fn numeric_attribute(&self, key: &str) -> f64 {
        self.get_property(key)
            .and_then(AttributeValue::as_f64)
            .unwrap_or(0.0)
    }

    /// GDP estimate, 0 when the attribute is missing
    pub fn gdp_estimate(&self) -> f64 {
        self.numeric_attribute(GDP_ATTRIBUTE)
    }

    /// Bounding envelope of the footprint
    pub fn envelope(&self) -> Option<Envelope> {
        self.footprint.bounding_rect().map(|rect| Envelope {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        })
    }

    /// Whether a point lies strictly inside the footprint (holes excluded)
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.footprint.contains(&Point::new(x, y))
    }
}

/// Supplier of boundary features
pub trait BoundarySource {
    /// Load all boundaries
    fn boundaries(&self) -> Result<Vec<Boundary>>;
}

/// Boundaries already held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryBoundaries {
    pub boundaries: Vec<Boundary>,
}

impl InMemoryBoundaries {
    pub fn new(boundaries: Vec<Boundary>) -> Self {
        Self { boundaries }
    }
}

impl BoundarySource for InMemoryBoundaries {
    fn boundaries(&self) -> Result<Vec<Boundary>> {
        Ok(self.boundaries.clone())
    }
}

/// Find a boundary by case-insensitive name
pub fn find_boundary<'a>(boundaries: &'a [Boundary], name: &str) -> Result<&'a Boundary> {
    boundaries
        .iter()
        .find(|b| b.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::BoundaryNotFound(name.to_string()))
}
