use std::cmp::Ordering;
use std::collections::BTreeMap;

use anyhow::Result;
use geo_types::Geometry;

use crate::filter::{Filter, FilterResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => (*a - *b).abs() < f64::EPSILON,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }

    /// Ordering between values of the same kind. Mixed kinds are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Value::String(text) => text.clone(),
            Value::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                format!("{}", *number as i64)
            }
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        if let Some(text) = value.as_str() {
            return Some(Value::String(text.to_string()));
        }
        if let Some(number) = value.as_f64() {
            return Some(Value::Number(number));
        }
        if let Some(flag) = value.as_bool() {
            return Some(Value::Bool(flag));
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub geometry: Geometry<f64>,
    pub properties: BTreeMap<String, Value>,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: id.into(),
            geometry: geometry.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Geometry kind name as seen by `geometry-type` filter expressions.
pub fn geometry_type(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => "Point",
        Geometry::LineString(_) | Geometry::MultiLineString(_) | Geometry::Line(_) => "LineString",
        Geometry::Polygon(_)
        | Geometry::MultiPolygon(_)
        | Geometry::Rect(_)
        | Geometry::Triangle(_) => "Polygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Lazily pulled features of one layer query. Dropping the cursor releases
/// whatever the source holds open for it.
pub type FeatureCursor<'a> = Box<dyn Iterator<Item = Result<Feature>> + 'a>;

pub trait FeatureSource {
    /// Open a cursor over the features that may satisfy `filter`. The filter
    /// is advisory: sources may return a superset.
    fn features<'a>(&'a self, filter: &'a Filter) -> Result<FeatureCursor<'a>>;
}

/// Feature source backed by a vector, evaluating the query filter itself.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    features: Vec<Feature>,
}

impl MemorySource {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FeatureSource for MemorySource {
    fn features<'a>(&'a self, filter: &'a Filter) -> Result<FeatureCursor<'a>> {
        Ok(Box::new(
            self.features
                .iter()
                .filter(move |feature| filter.evaluate(feature) == FilterResult::True)
                .cloned()
                .map(Ok),
        ))
    }
}
