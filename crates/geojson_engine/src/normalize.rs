//! Canonicalization of parsed JSON into a single `FeatureCollection`.
//!
//! Accepted top-level shapes, checked in this order:
//! 1. a `FeatureCollection` whose `features` is an array (kept as-is),
//! 2. a single `Feature`,
//! 3. a bare geometry (any object with `type` and `coordinates`),
//! 4. an array, taken as the feature list without per-element checks.
//!
//! Individual features are never validated here.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::IngestError;

pub const INVALID_FORMAT: &str = "Invalid GeoJSON format";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
enum CollectionType {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: CollectionType,
    features: Vec<Value>,
    /// Extra top-level members (`bbox`, `crs`, `name`, ...) of a collection
    /// that was already canonical.
    #[serde(flatten)]
    foreign_members: Map<String, Value>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Value>) -> Self {
        Self {
            kind: CollectionType::FeatureCollection,
            features,
            foreign_members: Map::new(),
        }
    }

    pub fn features(&self) -> &[Value] {
        &self.features
    }

    pub fn into_features(self) -> Vec<Value> {
        self.features
    }

    pub fn foreign_members(&self) -> &Map<String, Value> {
        &self.foreign_members
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn into_value(self) -> Value {
        let mut object = self.foreign_members;
        object.insert("type".into(), Value::String("FeatureCollection".into()));
        object.insert("features".into(), Value::Array(self.features));
        Value::Object(object)
    }
}

/// Canonicalize any parsed JSON value into a `FeatureCollection`.
pub fn normalize(value: Value) -> Result<FeatureCollection, IngestError> {
    match value {
        Value::Object(object) => normalize_object(object),
        Value::Array(features) => Ok(FeatureCollection::new(features)),
        _ => Err(IngestError::Normalization(INVALID_FORMAT.into())),
    }
}

fn normalize_object(mut object: Map<String, Value>) -> Result<FeatureCollection, IngestError> {
    if type_is(&object, "FeatureCollection") {
        if let Some(Value::Array(_)) = object.get("features") {
            let features = match object.remove("features") {
                Some(Value::Array(features)) => features,
                _ => Vec::new(),
            };
            object.remove("type");
            return Ok(FeatureCollection {
                kind: CollectionType::FeatureCollection,
                features,
                foreign_members: object,
            });
        }
    }

    if type_is(&object, "Feature") {
        return Ok(FeatureCollection::new(vec![Value::Object(object)]));
    }

    if is_truthy(object.get("type")) && is_truthy(object.get("coordinates")) {
        let feature = json!({
            "type": "Feature",
            "geometry": Value::Object(object),
            "properties": {},
        });
        return Ok(FeatureCollection::new(vec![feature]));
    }

    Err(IngestError::Normalization(INVALID_FORMAT.into()))
}

fn type_is(object: &Map<String, Value>, expected: &str) -> bool {
    object.get("type").and_then(Value::as_str) == Some(expected)
}

/// Loose presence test: missing, `null`, `false`, `0` and `""` do not count.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
