//! Per-project asset registry
//!
//! Holds every loaded asset keyed by name, one map per kind, plus the set of
//! load stages that have completed. Loaders consult the completed set before
//! doing any work, which is what turns the stage order into an enforced
//! barrier instead of a convention.
//!
//! Names are unique per kind. A second asset with the same name replaces
//! the first (last loaded wins) and a warning is logged.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use crate::asset::feature_set::FeatureSetAsset;
use crate::asset::layer::LayerAsset;
use crate::asset::renderer::RendererAsset;
use crate::asset::symbol::SymbolAsset;
use crate::error::{AtlasError, Result};
use crate::project::LoadStage;
use crate::resolve::SymbolSource;

/// Feature set shared between the registry and every layer that edits it.
pub type SharedFeatureSet = Arc<Mutex<FeatureSetAsset>>;

#[derive(Debug, Default)]
pub struct ProjectRegistry {
    symbols: BTreeMap<String, Arc<SymbolAsset>>,
    renderers: BTreeMap<String, Arc<RendererAsset>>,
    feature_sets: BTreeMap<String, SharedFeatureSet>,
    layers: BTreeMap<String, LayerAsset>,
    completed: BTreeSet<LoadStage>,
}

fn insert_named<T>(map: &mut BTreeMap<String, T>, kind: &str, name: String, value: T) {
    if map.insert(name.clone(), value).is_some() {
        warn!(kind, asset = %name, "duplicate asset name, last loaded wins");
    }
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail unless every stage `stage` depends on has completed.
    pub fn require_stages(&self, stage: LoadStage) -> Result<()> {
        match stage
            .requires()
            .iter()
            .find(|required| !self.completed.contains(required))
        {
            Some(missing) => Err(AtlasError::LoadOrderViolation {
                stage,
                missing: *missing,
            }),
            None => Ok(()),
        }
    }

    pub fn mark_complete(&mut self, stage: LoadStage) {
        self.completed.insert(stage);
    }

    pub fn is_complete(&self, stage: LoadStage) -> bool {
        self.completed.contains(&stage)
    }

    pub fn insert_symbol(&mut self, asset: Arc<SymbolAsset>) {
        insert_named(&mut self.symbols, "symbol", asset.name().to_string(), asset);
    }

    pub fn insert_renderer(&mut self, asset: Arc<RendererAsset>) {
        insert_named(&mut self.renderers, "renderer", asset.name().to_string(), asset);
    }

    pub fn insert_feature_set(&mut self, name: String, asset: SharedFeatureSet) {
        insert_named(&mut self.feature_sets, "feature set", name, asset);
    }

    pub fn insert_layer(&mut self, asset: LayerAsset) {
        insert_named(&mut self.layers, "layer", asset.name().to_string(), asset);
    }

    pub fn symbol(&self, name: &str) -> Option<&Arc<SymbolAsset>> {
        self.symbols.get(name)
    }

    pub fn renderer(&self, name: &str) -> Option<&Arc<RendererAsset>> {
        self.renderers.get(name)
    }

    pub fn feature_set(&self, name: &str) -> Option<&SharedFeatureSet> {
        self.feature_sets.get(name)
    }

    pub fn layer(&self, name: &str) -> Option<&LayerAsset> {
        self.layers.get(name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut LayerAsset> {
        self.layers.get_mut(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Arc<SymbolAsset>> {
        self.symbols.values()
    }

    pub fn renderers(&self) -> impl Iterator<Item = &Arc<RendererAsset>> {
        self.renderers.values()
    }

    /// Feature sets with their names, in name order.
    pub fn feature_sets(&self) -> impl Iterator<Item = (&str, &SharedFeatureSet)> {
        self.feature_sets.iter().map(|(name, set)| (name.as_str(), set))
    }

    pub fn layers(&self) -> impl Iterator<Item = &LayerAsset> {
        self.layers.values()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn renderer_count(&self) -> usize {
        self.renderers.len()
    }

    pub fn feature_set_count(&self) -> usize {
        self.feature_sets.len()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl SymbolSource for ProjectRegistry {
    fn resolve_symbol(&self, name: &str) -> Option<Value> {
        self.symbol(name).map(|s| s.to_json().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::record::AssetRecord;
    use crate::store::FileHandle;
    use std::path::PathBuf;

    fn symbol(file: &str, color: &str) -> Arc<SymbolAsset> {
        let handle = FileHandle::new(PathBuf::from("Symbols").join(file));
        let text = format!(r#"{{"type": "simple-marker", "color": "{}"}}"#, color);
        let record = AssetRecord::from_text(handle, text).unwrap();
        Arc::new(SymbolAsset::new(record).unwrap())
    }

    #[test]
    fn test_require_stages_reports_first_missing() {
        let mut registry = ProjectRegistry::new();
        assert!(registry.require_stages(LoadStage::Symbols).is_ok());
        assert!(registry.require_stages(LoadStage::FeatureSets).is_ok());

        let err = registry.require_stages(LoadStage::Layers).unwrap_err();
        assert!(matches!(
            err,
            AtlasError::LoadOrderViolation {
                stage: LoadStage::Layers,
                missing: LoadStage::Renderers
            }
        ));

        registry.mark_complete(LoadStage::Renderers);
        let err = registry.require_stages(LoadStage::Layers).unwrap_err();
        assert!(matches!(
            err,
            AtlasError::LoadOrderViolation {
                missing: LoadStage::FeatureSets,
                ..
            }
        ));

        registry.mark_complete(LoadStage::FeatureSets);
        assert!(registry.require_stages(LoadStage::Layers).is_ok());
    }

    #[test]
    fn test_lookup_returns_same_instance() {
        let mut registry = ProjectRegistry::new();
        let red = symbol("redDot.json", "red");
        registry.insert_symbol(red.clone());

        let found = registry.symbol("redDot").unwrap();
        assert!(Arc::ptr_eq(found, &red));
        assert!(registry.symbol("reddot").is_none());
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let mut registry = ProjectRegistry::new();
        registry.insert_symbol(symbol("dot.json", "red"));
        registry.insert_symbol(symbol("dot.json", "blue"));

        assert_eq!(registry.symbol_count(), 1);
        let resolved = registry.resolve_symbol("dot").unwrap();
        assert_eq!(resolved["color"], "blue");
    }
}
