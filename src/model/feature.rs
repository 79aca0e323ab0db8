//! Feature collections
//!
//! The feature-set file format: a field schema plus a list of features,
//! each with an attribute map and an optional geometry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::geometry::{Extent, Geometry};
use crate::error::{AtlasError, Result};

/// Attribute schema entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            alias: None,
            length: None,
            extra: Map::new(),
        }
    }
}

/// A single feature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Option<Geometry>) -> Self {
        Self {
            geometry,
            ..Self::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Integer object id stored under `field`, if any.
    pub fn object_id(&self, field: &str) -> Option<i64> {
        self.attributes.get(field).and_then(Value::as_i64)
    }
}

/// Decoded feature-set asset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCollection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id_field_name: Option<String>,
    pub fields: Vec<Field>,
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureCollection {
    /// Decode a feature-set JSON value read from `file`.
    ///
    /// Both `fields` and `features` must be present and be arrays.
    pub fn decode(file: &str, json: &Value) -> Result<Self> {
        let malformed = |reason: String| AtlasError::MalformedFeatureSet {
            file: file.to_string(),
            reason,
        };

        let object = json
            .as_object()
            .ok_or_else(|| malformed("expected a JSON object".to_string()))?;
        for key in ["fields", "features"] {
            match object.get(key) {
                Some(Value::Array(_)) => {}
                Some(_) => return Err(malformed(format!("`{}` must be an array", key))),
                None => return Err(malformed(format!("missing `{}`", key))),
            }
        }

        serde_json::from_value(json.clone()).map_err(|e| malformed(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding box of every feature geometry, `None` if nothing is located.
    pub fn extent(&self) -> Option<Extent> {
        Extent::union_all(
            self.features
                .iter()
                .filter_map(|f| f.geometry.as_ref())
                .filter_map(Geometry::extent),
        )
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}
