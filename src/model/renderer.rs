//! Renderer definitions
//!
//! A renderer maps features to symbols. By the time a renderer is decoded
//! every symbol reference has already been substituted with the symbol's
//! inline JSON, so the symbol fields here are fully decoded definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::symbol::SymbolDefinition;
use crate::error::{AtlasError, Result};

/// Kinds of renderer the decoder can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererKind {
    Simple,
    UniqueValue,
    ClassBreaks,
    Heatmap,
}

impl RendererKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "simple" => Some(RendererKind::Simple),
            "unique-value" | "uniqueValue" => Some(RendererKind::UniqueValue),
            "class-breaks" | "classBreaks" => Some(RendererKind::ClassBreaks),
            "heatmap" => Some(RendererKind::Heatmap),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RendererKind::Simple => "simple",
            RendererKind::UniqueValue => "unique-value",
            RendererKind::ClassBreaks => "class-breaks",
            RendererKind::Heatmap => "heatmap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleRenderer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueValueInfo {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolDefinition>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueValueRenderer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_symbol: Option<SymbolDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_label: Option<String>,
    #[serde(default)]
    pub unique_value_infos: Vec<UniqueValueInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassBreakInfo {
    /// Missing in the REST form, where a class starts at the previous break.
    #[serde(default, alias = "classMinValue", skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(alias = "classMaxValue")]
    pub max_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolDefinition>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassBreaksRenderer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization_field: Option<String>,
    /// Lower bound of the first class when the class itself names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_symbol: Option<SymbolDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_label: Option<String>,
    #[serde(default)]
    pub class_break_infos: Vec<ClassBreakInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapRenderer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default)]
    pub color_stops: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Decoded renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RendererDefinition {
    Simple(SimpleRenderer),
    UniqueValue(UniqueValueRenderer),
    ClassBreaks(ClassBreaksRenderer),
    Heatmap(HeatmapRenderer),
}

impl RendererDefinition {
    pub fn kind(&self) -> RendererKind {
        match self {
            RendererDefinition::Simple(_) => RendererKind::Simple,
            RendererDefinition::UniqueValue(_) => RendererKind::UniqueValue,
            RendererDefinition::ClassBreaks(_) => RendererKind::ClassBreaks,
            RendererDefinition::Heatmap(_) => RendererKind::Heatmap,
        }
    }

    /// Every symbol the renderer can draw with, default symbol first.
    pub fn symbols(&self) -> Vec<&SymbolDefinition> {
        match self {
            RendererDefinition::Simple(r) => r.symbol.iter().collect(),
            RendererDefinition::UniqueValue(r) => r
                .default_symbol
                .iter()
                .chain(r.unique_value_infos.iter().filter_map(|i| i.symbol.as_ref()))
                .collect(),
            RendererDefinition::ClassBreaks(r) => r
                .default_symbol
                .iter()
                .chain(r.class_break_infos.iter().filter_map(|i| i.symbol.as_ref()))
                .collect(),
            RendererDefinition::Heatmap(_) => Vec::new(),
        }
    }

    /// Symbol used to draw a feature with the given attributes.
    ///
    /// Falls back to the default symbol when no class matches. Heatmaps do
    /// not draw per-feature symbols.
    pub fn symbol_for(&self, attributes: &Map<String, Value>) -> Option<&SymbolDefinition> {
        match self {
            RendererDefinition::Simple(r) => r.symbol.as_ref(),
            RendererDefinition::UniqueValue(r) => unique_value_key(r, attributes)
                .and_then(|key| {
                    r.unique_value_infos
                        .iter()
                        .find(|info| value_key(&info.value).as_deref() == Some(key.as_str()))
                })
                .and_then(|info| info.symbol.as_ref())
                .or(r.default_symbol.as_ref()),
            RendererDefinition::ClassBreaks(r) => class_break_value(r, attributes)
                .and_then(|value| matching_class(r, value))
                .and_then(|info| info.symbol.as_ref())
                .or(r.default_symbol.as_ref()),
            RendererDefinition::Heatmap(_) => None,
        }
    }
}

fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn unique_value_key(r: &UniqueValueRenderer, attributes: &Map<String, Value>) -> Option<String> {
    let delimiter = r.field_delimiter.as_deref().unwrap_or(",");
    let parts: Option<Vec<String>> = [&r.field, &r.field2, &r.field3]
        .into_iter()
        .flatten()
        .map(|field| attributes.get(field).and_then(value_key))
        .collect();
    parts
        .filter(|p| !p.is_empty())
        .map(|p| p.join(delimiter))
}

fn class_break_value(r: &ClassBreaksRenderer, attributes: &Map<String, Value>) -> Option<f64> {
    let value = attributes.get(r.field.as_deref()?)?.as_f64()?;
    match &r.normalization_field {
        Some(field) => {
            let divisor = attributes.get(field)?.as_f64()?;
            (divisor != 0.0).then(|| value / divisor)
        }
        None => Some(value),
    }
}

/// First class whose range holds `value`.
///
/// A class without its own lower bound starts at the previous class's
/// maximum, or at the renderer's `minValue` for the first class.
fn matching_class(r: &ClassBreaksRenderer, value: f64) -> Option<&ClassBreakInfo> {
    let mut lower = r.min_value.unwrap_or(f64::NEG_INFINITY);
    for info in &r.class_break_infos {
        let min = info.min_value.unwrap_or(lower);
        if min <= value && value <= info.max_value {
            return Some(info);
        }
        lower = info.max_value;
    }
    None
}

/// Decode a renderer JSON value, after symbol substitution, read from `file`.
pub fn decode_renderer(file: &str, json: &Value) -> Result<RendererDefinition> {
    let declared = json.get("type").and_then(Value::as_str);
    let kind = declared
        .and_then(RendererKind::from_type_name)
        .ok_or_else(|| AtlasError::UnsupportedRendererType {
            file: file.to_string(),
            renderer_type: declared.unwrap_or("<missing>").to_string(),
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
    use crate::model::symbol::SymbolKind;
    use serde_json::json;

    fn marker(color: &str) -> Value {
        json!({"type": "simple-marker", "color": color})
    }

    fn attrs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_decode_simple() {
        let renderer =
            decode_renderer("simple.json", &json!({"type": "simple", "symbol": marker("red")}))
                .unwrap();

        assert_eq!(renderer.kind(), RendererKind::Simple);
        assert_eq!(renderer.symbols().len(), 1);
        assert_eq!(renderer.symbols()[0].kind(), SymbolKind::SimpleMarker);
    }

    #[test]
    fn test_unique_value_lookup_with_fallback() {
        let renderer = decode_renderer(
            "landuse.json",
            &json!({
                "type": "uniqueValue",
                "field": "zone",
                "defaultSymbol": marker("gray"),
                "uniqueValueInfos": [
                    {"value": "R1", "symbol": marker("yellow")},
                    {"value": 7, "symbol": marker("blue")}
                ]
            }),
        )
        .unwrap();

        let yellow = renderer.symbol_for(&attrs(json!({"zone": "R1"}))).unwrap();
        let blue = renderer.symbol_for(&attrs(json!({"zone": 7}))).unwrap();
        let gray = renderer.symbol_for(&attrs(json!({"zone": "C2"}))).unwrap();

        assert_eq!(serde_json::to_value(yellow).unwrap()["color"], json!("yellow"));
        assert_eq!(serde_json::to_value(blue).unwrap()["color"], json!("blue"));
        assert_eq!(serde_json::to_value(gray).unwrap()["color"], json!("gray"));
        assert_eq!(renderer.symbols().len(), 3);
    }

    #[test]
    fn test_unique_value_multi_field_key() {
        let renderer = decode_renderer(
            "roads.json",
            &json!({
                "type": "unique-value",
                "field": "class",
                "field2": "paved",
                "fieldDelimiter": "|",
                "uniqueValueInfos": [{"value": "highway|true", "symbol": marker("black")}]
            }),
        )
        .unwrap();

        let hit = renderer.symbol_for(&attrs(json!({"class": "highway", "paved": true})));
        let miss = renderer.symbol_for(&attrs(json!({"class": "highway"})));
        assert!(hit.is_some());
        assert!(miss.is_none());
    }

    #[test]
    fn test_class_breaks_with_normalization() {
        let renderer = decode_renderer(
            "density.json",
            &json!({
                "type": "class-breaks",
                "field": "pop",
                "normalizationField": "area",
                "classBreakInfos": [
                    {"minValue": 0, "maxValue": 10, "symbol": marker("light")},
                    {"minValue": 10, "maxValue": 100, "symbol": marker("dark")}
                ]
            }),
        )
        .unwrap();

        let light = renderer.symbol_for(&attrs(json!({"pop": 50, "area": 10}))).unwrap();
        let dark = renderer.symbol_for(&attrs(json!({"pop": 500, "area": 10}))).unwrap();
        assert_eq!(serde_json::to_value(light).unwrap()["color"], json!("light"));
        assert_eq!(serde_json::to_value(dark).unwrap()["color"], json!("dark"));
        assert!(renderer.symbol_for(&attrs(json!({"pop": 5, "area": 0}))).is_none());
    }

    #[test]
    fn test_class_breaks_rest_form() {
        let renderer = decode_renderer(
            "rest.json",
            &json!({
                "type": "classBreaks",
                "field": "pop",
                "minValue": 5,
                "classBreakInfos": [
                    {"classMaxValue": 10, "symbol": marker("light")},
                    {"classMaxValue": 100, "symbol": marker("dark")}
                ]
            }),
        )
        .unwrap();

        let color = |pop: f64| {
            renderer
                .symbol_for(&attrs(json!({"pop": pop})))
                .map(|s| serde_json::to_value(s).unwrap()["color"].clone())
        };
        assert_eq!(color(5.0), Some(json!("light")));
        assert_eq!(color(10.0), Some(json!("light")));
        assert_eq!(color(50.0), Some(json!("dark")));
        assert_eq!(color(2.0), None);
        assert_eq!(color(500.0), None);
    }

    #[test]
    fn test_heatmap_has_no_symbols() {
        let renderer = decode_renderer(
            "heat.json",
            &json!({"type": "heatmap", "radius": 12, "colorStops": [{"ratio": 0, "color": "blue"}]}),
        )
        .unwrap();
        assert!(renderer.symbols().is_empty());
        assert!(renderer.symbol_for(&Map::new()).is_none());
    }

    #[test]
    fn test_unsupported_renderer_type() {
        let err = decode_renderer("dots.json", &json!({"type": "dot-density"})).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_RENDERER_TYPE");
        assert_eq!(err.file(), Some("dots.json"));
    }

    #[test]
    fn test_unresolved_string_symbol_is_malformed() {
        let err = decode_renderer("raw.json", &json!({"type": "simple", "symbol": "redDot"}))
            .unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_ASSET");
    }
}
