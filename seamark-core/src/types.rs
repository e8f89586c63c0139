use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A property value carried by a feature. Feature data is parsed upstream
/// (GeoJSON or vector tiles), so only numbers and strings survive to here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Number(v as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Text(v)
    }
}

/// Parsed form of a stable feature identifier `"<collection>.<numeric-id>"`.
///
/// The numeric suffix is what the hit pass encodes into pixels, so it must
/// fit an `i32`. Identifiers that do not match the shape are rejected rather
/// than guessed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRef {
    pub collection: String,
    pub index: i32,
}

impl FeatureRef {
    pub fn new<S: Into<String>>(collection: S, index: i32) -> Self {
        Self {
            collection: collection.into(),
            index,
        }
    }

    /// Parse `"ais.12345"` into `(collection: "ais", index: 12345)`.
    pub fn parse(id: &str) -> CoreResult<Self> {
        let (collection, suffix) = id
            .split_once('.')
            .ok_or_else(|| CoreError::malformed_id(id))?;
        if collection.is_empty() {
            return Err(CoreError::malformed_id(id));
        }
        let index: i32 = suffix
            .parse()
            .map_err(|_| CoreError::malformed_id(id))?;
        Ok(Self::new(collection, index))
    }
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.collection, self.index)
    }
}

/// A point feature: stable identifier, projected 2D position, and named
/// properties. Created and owned by the external data layer; the rendering
/// core only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    id: String,
    geometry: [f64; 2],
    properties: HashMap<String, PropertyValue>,
}

impl Feature {
    pub fn new<S: Into<String>>(id: S, geometry: [f64; 2]) -> Self {
        Self {
            id: id.into(),
            geometry,
            properties: HashMap::new(),
        }
    }

    /// Builder-style property attachment, used by tests and demo data.
    pub fn with_property<S: Into<String>, V: Into<PropertyValue>>(
        mut self,
        name: S,
        value: V,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn geometry(&self) -> [f64; 2] {
        self.geometry
    }

    pub fn feature_ref(&self) -> CoreResult<FeatureRef> {
        FeatureRef::parse(&self.id)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &HashMap<String, PropertyValue> {
        &self.properties
    }

    /// Numeric property access. Missing or string-valued properties are a
    /// contract violation from the data layer and abort the caller.
    pub fn number(&self, name: &str) -> CoreResult<f64> {
        match self.properties.get(name) {
            Some(PropertyValue::Number(v)) => Ok(*v),
            Some(PropertyValue::Text(_)) => {
                Err(CoreError::non_numeric_property(self.id.as_str(), name))
            }
            None => Err(CoreError::missing_property(self.id.as_str(), name)),
        }
    }

    pub fn text(&self, name: &str) -> CoreResult<&str> {
        match self.properties.get(name) {
            Some(PropertyValue::Text(v)) => Ok(v),
            _ => Err(CoreError::missing_property(self.id.as_str(), name)),
        }
    }
}

/// Axis-aligned world-space extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Spatial query surface of the external data layer. The index itself lives
/// upstream; the rendering core only asks for the subset of features
/// intersecting an extent.
pub trait FeatureSource {
    fn features_in_extent(&self, extent: &Extent) -> Vec<&Feature>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_ref_parse() {
        let r = FeatureRef::parse("ais.12345").unwrap();
        assert_eq!(r.collection, "ais");
        assert_eq!(r.index, 12345);
        assert_eq!(r.to_string(), "ais.12345");
    }

    #[test]
    fn test_feature_ref_parse_rejects_malformed() {
        assert!(FeatureRef::parse("ais").is_err());
        assert!(FeatureRef::parse("ais.").is_err());
        assert!(FeatureRef::parse(".12").is_err());
        assert!(FeatureRef::parse("ais.not-a-number").is_err());
        assert!(FeatureRef::parse("ais.1.2").is_err());
    }

    #[test]
    fn test_property_access() {
        let f = Feature::new("ais.7", [1.0, 2.0])
            .with_property("sog", 12.5)
            .with_property("name", "EVER GIVEN");

        assert_eq!(f.number("sog").unwrap(), 12.5);
        assert_eq!(f.text("name").unwrap(), "EVER GIVEN");
        assert!(matches!(
            f.number("cog"),
            Err(CoreError::MissingProperty { .. })
        ));
        assert!(matches!(
            f.number("name"),
            Err(CoreError::NonNumericProperty { .. })
        ));
    }

    #[test]
    fn test_extent_predicates() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(5.0, 5.0, 15.0, 15.0);
        let c = Extent::new(11.0, 11.0, 12.0, 12.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.contains_point(10.0, 0.0));
        assert!(!a.contains_point(10.1, 0.0));
        assert_eq!(a.width(), 10.0);
        assert_eq!(a.height(), 10.0);
    }
}
