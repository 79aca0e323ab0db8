//! Layer assets
//!
//! A layer names at most one feature set and at most one renderer. Both
//! lookups are soft: a name that does not resolve leaves that side of the
//! layer empty and logs a warning. (Renderer → symbol lookups, by contrast,
//! are fatal.)
//!
//! Constructing a layer also builds its live, editable counterpart and
//! subscribes the edit-sync channel to it in the same call, so the live
//! layer never exists without its write-back hook.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::record::AssetRecord;
use super::renderer::RendererAsset;
use crate::config::ProjectConfig;
use crate::error::{AtlasError, Result};
use crate::live::{EditResult, EditSync, EditableLayer, LayerEdits, LayerOptions};
use crate::model::feature::FeatureCollection;
use crate::project::LoadStage;
use crate::registry::{ProjectRegistry, SharedFeatureSet};
use crate::store::{FileHandle, ProjectStore};

fn default_editing_enabled() -> bool {
    true
}

/// Contents of a layer file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
    #[serde(default = "default_editing_enabled")]
    pub editing_enabled: bool,
}

impl Default for LayerDefinition {
    fn default() -> Self {
        Self {
            feature_set: None,
            renderer: None,
            editing_enabled: true,
        }
    }
}

impl LayerDefinition {
    pub fn decode(file: &str, json: &Value) -> Result<Self> {
        serde_json::from_value(json.clone()).map_err(|source| AtlasError::MalformedAsset {
            file: file.to_string(),
            source,
        })
    }
}

/// Dependencies a layer was resolved against.
#[derive(Debug, Clone, Default)]
pub struct LayerSources {
    /// The shared feature set and a snapshot of its collection at resolve time.
    pub feature_set: Option<(SharedFeatureSet, FeatureCollection)>,
    pub renderer: Option<Arc<RendererAsset>>,
}

#[derive(Debug)]
pub struct LayerAsset {
    record: AssetRecord,
    definition: LayerDefinition,
    source_feature: Option<SharedFeatureSet>,
    source_snapshot: Option<FeatureCollection>,
    renderer: Option<Arc<RendererAsset>>,
    live: EditableLayer,
    sync: EditSync,
}

impl LayerAsset {
    pub fn new(
        record: AssetRecord,
        definition: LayerDefinition,
        sources: LayerSources,
        config: &ProjectConfig,
    ) -> Self {
        let (source_feature, source_snapshot) = match sources.feature_set {
            Some((shared, snapshot)) => (Some(shared), Some(snapshot)),
            None => (None, None),
        };

        let mut live = EditableLayer::new(
            source_snapshot.clone(),
            LayerOptions {
                title: record.file_name(),
                renderer: sources.renderer.as_ref().map(|r| Arc::clone(r.renderer())),
                editing_enabled: definition.editing_enabled,
                default_object_id_field: config.default_object_id_field.clone(),
            },
        );
        let sync = EditSync::attach(&mut live, source_feature.clone(), config.pretty_json);

        Self {
            record,
            definition,
            source_feature,
            source_snapshot,
            renderer: sources.renderer,
            live,
            sync,
        }
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    pub fn record(&self) -> &AssetRecord {
        &self.record
    }

    pub fn definition(&self) -> &LayerDefinition {
        &self.definition
    }

    /// Feature set this layer edits, if its reference resolved.
    pub fn source_feature(&self) -> Option<&SharedFeatureSet> {
        self.source_feature.as_ref()
    }

    /// The feature set's collection as it was when the layer was built.
    pub fn source_snapshot(&self) -> Option<&FeatureCollection> {
        self.source_snapshot.as_ref()
    }

    pub fn renderer(&self) -> Option<&Arc<RendererAsset>> {
        self.renderer.as_ref()
    }

    pub fn live(&self) -> &EditableLayer {
        &self.live
    }

    /// Apply edits to the live layer and write the result back to storage.
    ///
    /// This is the only way to change the live layer, so every applied batch
    /// reaches the feature-set file before the call returns.
    pub async fn apply_edits<S: ProjectStore>(
        &mut self,
        edits: LayerEdits,
        store: &S,
    ) -> Result<EditResult> {
        let result = self.live.apply_edits(edits)?;
        self.sync.flush(&self.live, store).await?;
        Ok(result)
    }
}

/// Read a layer file, resolve its references and register it.
///
/// Returns the registered layer's name.
pub async fn load_layer<S: ProjectStore>(
    store: &S,
    handle: &FileHandle,
    registry: &mut ProjectRegistry,
    config: &ProjectConfig,
) -> Result<String> {
    registry.require_stages(LoadStage::Layers)?;

    let record = AssetRecord::load(store, handle).await?;
    let file = record.file_name();
    let definition = LayerDefinition::decode(&file, record.json())?;

    let mut sources = LayerSources::default();
    if let Some(name) = &definition.feature_set {
        match registry.feature_set(name).cloned() {
            Some(shared) => {
                let snapshot = shared.lock().await.collection().clone();
                sources.feature_set = Some((shared, snapshot));
            }
            None => warn!(layer = %file, feature_set = %name, "feature set not found, layer has no source"),
        }
    }
    if let Some(name) = &definition.renderer {
        match registry.renderer(name).cloned() {
            Some(renderer) => sources.renderer = Some(renderer),
            None => warn!(layer = %file, renderer = %name, "renderer not found, layer has no symbology"),
        }
    }

    let layer = LayerAsset::new(record, definition, sources, config);
    let name = layer.name().to_string();
    debug!(
        asset = %name,
        features = layer.live().len(),
        has_source = layer.source_feature().is_some(),
        has_renderer = layer.renderer().is_some(),
        editable = layer.live().editing_enabled(),
        "loaded layer"
    );

    registry.insert_layer(layer);
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn record(text: &str) -> AssetRecord {
        let handle = FileHandle::new(PathBuf::from("Layers/roads.json"));
        AssetRecord::from_text(handle, text.to_string()).unwrap()
    }

    #[test]
    fn test_definition_defaults() {
        let definition = LayerDefinition::decode("empty.json", &json!({})).unwrap();
        assert_eq!(definition, LayerDefinition::default());
        assert!(definition.editing_enabled);
    }

    #[test]
    fn test_definition_tolerates_unknown_keys() {
        let definition = LayerDefinition::decode(
            "roads.json",
            &json!({"featureSet": "roads", "editingEnabled": false, "opacity": 0.5}),
        )
        .unwrap();
        assert_eq!(definition.feature_set.as_deref(), Some("roads"));
        assert!(!definition.editing_enabled);
    }

    #[test]
    fn test_definition_type_error_is_malformed() {
        let err = LayerDefinition::decode("roads.json", &json!({"renderer": 3})).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_ASSET");
    }

    #[test]
    fn test_new_layer_without_sources() {
        let layer = LayerAsset::new(
            record("{}"),
            LayerDefinition::default(),
            LayerSources::default(),
            &ProjectConfig::default(),
        );

        assert_eq!(layer.name(), "roads");
        assert_eq!(layer.live().title(), "roads.json");
        assert!(layer.live().is_empty());
        assert!(layer.source_feature().is_none());
        assert!(layer.renderer().is_none());
        assert!(layer.live().editing_enabled());
        assert_eq!(layer.live().subscriber_count(), 1);
    }
}
