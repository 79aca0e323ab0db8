//! Symbol definitions
//!
//! Symbols are leaves of the asset graph: they reference nothing. Each symbol
//! file declares its kind through a `type` discriminator, using either the
//! web SDK names (`simple-marker`) or the REST names (`esriSMS`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AtlasError, Result};

/// Kinds of symbol the decoder can classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    SimpleMarker,
    SimpleLine,
    SimpleFill,
    PictureMarker,
    PictureFill,
    Text,
}

impl SymbolKind {
    /// Classify a `type` discriminator.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "simple-marker" | "esriSMS" => Some(SymbolKind::SimpleMarker),
            "simple-line" | "esriSLS" => Some(SymbolKind::SimpleLine),
            "simple-fill" | "esriSFS" => Some(SymbolKind::SimpleFill),
            "picture-marker" | "esriPMS" => Some(SymbolKind::PictureMarker),
            "picture-fill" | "esriPFS" => Some(SymbolKind::PictureFill),
            "text" | "esriTS" => Some(SymbolKind::Text),
            _ => None,
        }
    }

    /// Canonical discriminator written back on serialization.
    pub fn type_name(&self) -> &'static str {
        match self {
            SymbolKind::SimpleMarker => "simple-marker",
            SymbolKind::SimpleLine => "simple-line",
            SymbolKind::SimpleFill => "simple-fill",
            SymbolKind::PictureMarker => "picture-marker",
            SymbolKind::PictureFill => "picture-fill",
            SymbolKind::Text => "text",
        }
    }
}

/// RGBA array or CSS color string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Rgba(Vec<f64>),
    Css(String),
}

/// Outline of a marker or fill.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSymbol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSymbol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillSymbol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureSymbol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSymbol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halo_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halo_size: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Decoded symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SymbolDefinition {
    SimpleMarker(MarkerSymbol),
    SimpleLine(LineSymbol),
    SimpleFill(FillSymbol),
    PictureMarker(PictureSymbol),
    PictureFill(PictureSymbol),
    Text(TextSymbol),
}

impl SymbolDefinition {
    pub fn kind(&self) -> SymbolKind {
        match self {
            SymbolDefinition::SimpleMarker(_) => SymbolKind::SimpleMarker,
            SymbolDefinition::SimpleLine(_) => SymbolKind::SimpleLine,
            SymbolDefinition::SimpleFill(_) => SymbolKind::SimpleFill,
            SymbolDefinition::PictureMarker(_) => SymbolKind::PictureMarker,
            SymbolDefinition::PictureFill(_) => SymbolKind::PictureFill,
            SymbolDefinition::Text(_) => SymbolKind::Text,
        }
    }
}

/// Decode a symbol JSON value read from `file`.
///
/// The `type` discriminator is classified first so that an unknown kind is
/// reported as such rather than as a generic schema error.
pub fn decode_symbol(file: &str, json: &Value) -> Result<SymbolDefinition> {
    let declared = json.get("type").and_then(Value::as_str);
    let kind = declared
        .and_then(SymbolKind::from_type_name)
        .ok_or_else(|| AtlasError::UnsupportedSymbolType {
            file: file.to_string(),
            symbol_type: declared.unwrap_or("<missing>").to_string(),
        })?;

    let mut canonical = json.clone();
    if let Value::Object(map) = &mut canonical {
        map.insert("type".to_string(), Value::from(kind.type_name()));
    }

    serde_json::from_value(canonical).map_err(|source| AtlasError::MalformedAsset {
        file: file.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_decode_simple_marker() {
        let symbol = decode_symbol(
            "redDot.json",
            &json!({"type": "simple-marker", "color": [255, 0, 0, 1], "size": 8, "style": "circle"}),
        )
        .unwrap();

        match symbol {
            SymbolDefinition::SimpleMarker(marker) => {
                assert_eq!(marker.color, Some(Color::Rgba(vec![255.0, 0.0, 0.0, 1.0])));
                assert_eq!(marker.size, Some(8.0));
                assert_eq!(marker.style.as_deref(), Some("circle"));
            }
            other => panic!("expected marker, got {:?}", other),
        }
    }

    #[test_case("esriSMS", SymbolKind::SimpleMarker)]
    #[test_case("esriSLS", SymbolKind::SimpleLine)]
    #[test_case("esriSFS", SymbolKind::SimpleFill)]
    #[test_case("esriPMS", SymbolKind::PictureMarker)]
    #[test_case("esriTS", SymbolKind::Text)]
    fn test_rest_names_normalize(type_name: &str, expected: SymbolKind) {
        let symbol = decode_symbol("s.json", &json!({ "type": type_name })).unwrap();
        assert_eq!(symbol.kind(), expected);

        let serialized = serde_json::to_value(&symbol).unwrap();
        assert_eq!(serialized["type"], json!(expected.type_name()));
    }

    #[test]
    fn test_unknown_properties_survive_round_trip() {
        let symbol = decode_symbol(
            "label.json",
            &json!({"type": "text", "text": "A", "font": {"family": "Arial", "size": 12}}),
        )
        .unwrap();

        let serialized = serde_json::to_value(&symbol).unwrap();
        assert_eq!(serialized["font"], json!({"family": "Arial", "size": 12}));
        assert_eq!(serialized["text"], json!("A"));
    }

    #[test]
    fn test_unsupported_type() {
        let err = decode_symbol("cim.json", &json!({"type": "cim"})).unwrap_err();
        match err {
            AtlasError::UnsupportedSymbolType { file, symbol_type } => {
                assert_eq!(file, "cim.json");
                assert_eq!(symbol_type, "cim");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_type() {
        let err = decode_symbol("bare.json", &json!({"color": "red"})).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_SYMBOL_TYPE");
    }

    #[test]
    fn test_wrong_field_type_is_malformed() {
        let err = decode_symbol("bad.json", &json!({"type": "simple-line", "width": "wide"}))
            .unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_ASSET");
    }
}
